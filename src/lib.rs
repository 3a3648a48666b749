pub mod calculations;
pub mod calendar;
pub mod config;
pub mod error;
pub mod graph;
pub mod persistence;
pub mod schedule;
pub mod task;

pub use calendar::{BdaysHolidays, FixedHolidays, HolidayProvider, WorkCalendar};
pub use config::{DelayPolicy, ScheduleConfig};
pub use error::{ConfigError, DependencyCycle, Diagnostic, GraphError, ScheduleError};
pub use graph::TaskGraph;
pub use persistence::{PersistenceError, ProjectInput, load_project_from_json, save_entries_to_json};
pub use schedule::{RunSummary, ScheduleEngine, ScheduleEntry, ScheduleOutcome};
pub use task::{ChecklistItem, ExternalRecord, Task, TaskStatus};
