use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("weekend days cover the whole week; at least one working weekday is required")]
    NoWorkingDays,
    #[error("lookahead window must be between 1 and 3650 days (got {0})")]
    InvalidLookahead(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate task id {0}")]
    DuplicateTaskId(String),
}

/// A set of task ids whose dependencies loop back onto themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    pub task_ids: Vec<String>,
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.task_ids.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("dependency cycle detected between tasks {}", format_cycles(.cycles))]
    DependencyCycle {
        cycles: Vec<DependencyCycle>,
        blocked: Vec<String>,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ScheduleError {
    /// Every task id that sits on a cycle, sorted and deduplicated.
    pub fn cyclic_task_ids(&self) -> Vec<String> {
        match self {
            ScheduleError::DependencyCycle { cycles, .. } => {
                let mut ids: Vec<String> = cycles
                    .iter()
                    .flat_map(|cycle| cycle.task_ids.iter().cloned())
                    .collect();
                ids.sort();
                ids.dedup();
                ids
            }
            _ => Vec::new(),
        }
    }
}

fn format_cycles(cycles: &[DependencyCycle]) -> String {
    cycles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Non-fatal conditions recovered during a run.
///
/// Each one is also logged when it is raised; the outcome keeps them so
/// callers can report warnings next to a successful schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    MissingEvidence { task_id: String },
    UnresolvedReference { task_id: String, missing: String },
    SelfDependency { task_id: String },
    UnknownRecord { task_id: String },
    UnsupportedCalendar { country: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingEvidence { task_id } => {
                write!(f, "task {task_id} has no linked record or dependency; using fallback dates")
            }
            Diagnostic::UnresolvedReference { task_id, missing } => {
                write!(f, "task {task_id} depends on unknown task {missing}; dependency dropped")
            }
            Diagnostic::SelfDependency { task_id } => {
                write!(f, "task {task_id} depends on itself; dependency dropped")
            }
            Diagnostic::UnknownRecord { task_id } => {
                write!(f, "external record linked to unknown task {task_id}; record ignored")
            }
            Diagnostic::UnsupportedCalendar { country } => write!(
                f,
                "no holiday calendar for country {country}; using weekends only"
            ),
        }
    }
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::MissingEvidence { .. })
    }
}
