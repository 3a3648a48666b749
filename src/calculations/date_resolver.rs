use crate::graph::TaskNode;
use crate::task::ExternalRecord;
use chrono::{Duration, NaiveDate};

/// Run-wide inputs shared by every resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveContext {
    pub today: NaiveDate,
    pub floor_date: Option<NaiveDate>,
    /// Earliest record creation date seen in the run.
    pub earliest_created: Option<NaiveDate>,
    pub lookahead_days: i64,
}

/// Where a resolved end date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSource {
    Closed,
    Due,
    Lookahead,
}

/// Outcome of resolving a single task from its own evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Done task; both dates are historical and never adjusted again.
    Fixed { start: NaiveDate, end: NaiveDate },
    /// Dependency-free task with both dates decided.
    Resolved { start: NaiveDate, end: NaiveDate },
    /// The end is known but the start waits for dependency propagation.
    DependencyPending { end: NaiveDate },
}

/// Derives dates for one task from its status, record and the run context.
pub struct DateResolver<'a> {
    context: &'a ResolveContext,
}

impl<'a> DateResolver<'a> {
    pub fn new(context: &'a ResolveContext) -> Self {
        Self { context }
    }

    pub fn resolve(&self, task: &TaskNode) -> Resolution {
        let record = task.record.as_ref();

        if task.status.is_done() {
            let (end, end_source) = self.end_date(task, None);
            let start = record
                .and_then(|r| r.created_at)
                .unwrap_or(end - Duration::days(1));
            let (start, end) = if end_source == EndSource::Closed {
                Self::anchor_to_end(start, end)
            } else {
                Self::duration_floor(start, end)
            };
            return Resolution::Fixed { start, end };
        }

        if task.has_dependencies() {
            let (end, _) = self.end_date(task, None);
            return Resolution::DependencyPending { end };
        }

        let start = self.independent_start(record);
        let (end, _) = self.end_date(task, Some(start));
        let (start, end) = Self::duration_floor(start, end);
        Resolution::Resolved { start, end }
    }

    /// First match wins: closed date of a done task, declared due date,
    /// then the lookahead placeholder.
    ///
    /// The placeholder counts from today, or from `start` when a known start
    /// already lies beyond today.
    pub fn end_date(&self, task: &TaskNode, start: Option<NaiveDate>) -> (NaiveDate, EndSource) {
        let record = task.record.as_ref();
        if task.status.is_done() {
            if let Some(closed) = record.and_then(|r| r.closed_at) {
                return (closed, EndSource::Closed);
            }
        }
        if let Some(due) = record.and_then(|r| r.due_date) {
            return (due, EndSource::Due);
        }
        let anchor = start.map_or(self.context.today, |s| s.max(self.context.today));
        (
            anchor + Duration::days(self.context.lookahead_days),
            EndSource::Lookahead,
        )
    }

    /// Later of record creation and floor date, falling back to the run's
    /// earliest creation date and finally to today.
    pub fn independent_start(&self, record: Option<&ExternalRecord>) -> NaiveDate {
        let created = record.and_then(|r| r.created_at);
        match (created, self.context.floor_date) {
            (Some(created), Some(floor)) => created.max(floor),
            (Some(created), None) => created,
            (None, Some(floor)) => floor,
            (None, None) => self.context.earliest_created.unwrap_or(self.context.today),
        }
    }

    /// Guarantees at least one day between start and end by moving the end.
    pub fn duration_floor(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        if end <= start {
            (start, start + Duration::days(1))
        } else {
            (start, end)
        }
    }

    /// Same guarantee, but the end is authoritative so the start moves.
    fn anchor_to_end(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        if end <= start {
            (end - Duration::days(1), end)
        } else {
            (start, end)
        }
    }
}
