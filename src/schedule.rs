use crate::calculations::{ForwardPass, ResolutionKind, ResolveContext};
use crate::calendar::{BdaysHolidays, HolidayProvider, WorkCalendar};
use crate::config::ScheduleConfig;
use crate::error::{ConfigError, DependencyCycle, Diagnostic, ScheduleError};
use crate::graph::TaskGraph;
use crate::task::{ExternalRecord, Task, TaskStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Resolved dates for one task. Entries are only created by the engine and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    task_id: String,
    display_label: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: TaskStatus,
    is_subtask: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<String>,
    resolution: ResolutionKind,
    is_overdue: bool,
}

impl ScheduleEntry {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_subtask(&self) -> bool {
        self.is_subtask
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Ids of the direct dependencies, for drawing arrows.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn resolution(&self) -> ResolutionKind {
        self.resolution
    }

    /// Not done and due before "today".
    pub fn is_overdue(&self) -> bool {
        self.is_overdue
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub entry_count: usize,
    pub done_count: usize,
    pub overdue_count: usize,
    pub earliest_start: Option<NaiveDate>,
    pub latest_end: Option<NaiveDate>,
    pub cycle_count: usize,
    pub blocked_count: usize,
    pub warning_count: usize,
}

impl RunSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.entry_count));
        parts.push(format!("done={}", self.done_count));
        if self.overdue_count > 0 {
            parts.push(format!("overdue={}", self.overdue_count));
        }
        if let (Some(start), Some(end)) = (self.earliest_start, self.latest_end) {
            parts.push(format!("window={start}..{end}"));
        }
        if self.warning_count > 0 {
            parts.push(format!("warnings={}", self.warning_count));
        }
        if self.cycle_count > 0 {
            parts.push(format!("cycles={}", self.cycle_count));
            parts.push(format!("blocked={}", self.blocked_count));
        }
        parts.join(", ")
    }
}

/// Everything one run produced.
///
/// A run with cycles still carries entries for every task that does not
/// sit on or behind a cycle; callers choose whether that partial result is
/// acceptable via [`ScheduleOutcome::into_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    entries: Vec<ScheduleEntry>,
    cycles: Vec<DependencyCycle>,
    blocked: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ScheduleOutcome {
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn entry(&self, task_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|entry| entry.task_id == task_id)
    }

    pub fn cycles(&self) -> &[DependencyCycle] {
        &self.cycles
    }

    /// Ids left unscheduled because of a cycle, in declaration order.
    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn is_complete(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            entry_count: self.entries.len(),
            done_count: self.entries.iter().filter(|e| e.status.is_done()).count(),
            overdue_count: self.entries.iter().filter(|e| e.is_overdue).count(),
            earliest_start: self.entries.iter().map(|e| e.start_date).min(),
            latest_end: self.entries.iter().map(|e| e.end_date).max(),
            cycle_count: self.cycles.len(),
            blocked_count: self.blocked.len(),
            warning_count: self.warnings().count(),
        }
    }

    /// Entries of a complete run, or the cycle error.
    pub fn into_result(self) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        if self.cycles.is_empty() {
            Ok(self.entries)
        } else {
            Err(ScheduleError::DependencyCycle {
                cycles: self.cycles,
                blocked: self.blocked,
            })
        }
    }
}

/// Resolves start and end dates for every task in a graph.
///
/// The engine holds only configuration and the holiday source. Every run
/// gets a fresh calendar, so holiday caches never outlive a run.
pub struct ScheduleEngine {
    config: ScheduleConfig,
    holidays: Arc<dyn HolidayProvider>,
}

impl fmt::Debug for ScheduleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScheduleEngine {
    /// Engine with the `bdays` holiday tables for the configured country.
    pub fn new(config: ScheduleConfig) -> Result<Self, ConfigError> {
        Self::with_holiday_provider(config, Box::new(BdaysHolidays))
    }

    pub fn with_holiday_provider(
        config: ScheduleConfig,
        provider: Box<dyn HolidayProvider>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            holidays: Arc::from(provider),
        })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// A new calendar for the configured country and weekend set.
    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar::with_shared_provider(
            self.config.country_code.clone(),
            self.config.weekend_days.iter().copied(),
            Arc::clone(&self.holidays),
        )
    }

    /// Build the graph from raw inputs and run it.
    pub fn schedule<I, R>(
        &self,
        tasks: I,
        records: R,
        today: NaiveDate,
    ) -> Result<ScheduleOutcome, ScheduleError>
    where
        I: IntoIterator<Item = Task>,
        R: IntoIterator<Item = (String, ExternalRecord)>,
    {
        let graph = TaskGraph::build(tasks, records)?;
        Ok(self.run(&graph, today))
    }

    pub fn run(&self, graph: &TaskGraph, today: NaiveDate) -> ScheduleOutcome {
        let context = ResolveContext {
            today,
            floor_date: self.config.floor_date,
            earliest_created: graph.earliest_created(),
            lookahead_days: self.config.lookahead_days,
        };
        let calendar = self.calendar();
        let pass = ForwardPass::new(graph, &calendar, context, self.config.delay_policy);
        let (resolved, pass_diagnostics) = pass.execute();

        let mut entries = Vec::with_capacity(graph.len());
        for ix in graph.display_order() {
            let Some(dates) = resolved[ix] else {
                continue;
            };
            let node = graph.node(ix);
            entries.push(ScheduleEntry {
                task_id: node.id.clone(),
                display_label: format!("{}: {}", node.id, node.title),
                start_date: dates.start,
                end_date: dates.end,
                status: node.status,
                is_subtask: node.is_subtask(),
                parent_id: node.parent.map(|p| graph.node(p).id.clone()),
                dependencies: node
                    .dependencies
                    .iter()
                    .map(|&dep| graph.node(dep).id.clone())
                    .collect(),
                resolution: dates.kind,
                is_overdue: !node.status.is_done() && dates.end < today,
            });
        }

        let mut diagnostics = graph.diagnostics().to_vec();
        diagnostics.extend(pass_diagnostics);
        if calendar.is_degraded() {
            diagnostics.push(Diagnostic::UnsupportedCalendar {
                country: calendar.country().to_string(),
            });
        }

        let outcome = ScheduleOutcome {
            entries,
            cycles: graph.cycles().to_vec(),
            blocked: graph.blocked_ids(),
            diagnostics,
        };
        tracing::info!(summary = %outcome.summary().to_cli_summary(), "schedule run finished");
        outcome
    }
}
