use crate::calculations::date_resolver::{DateResolver, ResolveContext, Resolution};
use crate::calendar::WorkCalendar;
use crate::config::DelayPolicy;
use crate::error::Diagnostic;
use crate::graph::TaskGraph;
use chrono::NaiveDate;
use serde::Serialize;

/// How a task's dates were arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    FixedByStatus,
    Independent,
    DependencyDriven,
    Inherited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: ResolutionKind,
}

/// Walks the graph in topological order and resolves every schedulable task.
pub struct ForwardPass<'a> {
    graph: &'a TaskGraph,
    calendar: &'a WorkCalendar,
    context: ResolveContext,
    delay_policy: DelayPolicy,
}

impl<'a> ForwardPass<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        calendar: &'a WorkCalendar,
        context: ResolveContext,
        delay_policy: DelayPolicy,
    ) -> Self {
        Self {
            graph,
            calendar,
            context,
            delay_policy,
        }
    }

    /// Dates indexed by arena slot; `None` for tasks blocked by a cycle.
    pub fn execute(&self) -> (Vec<Option<ResolvedDates>>, Vec<Diagnostic>) {
        let resolver = DateResolver::new(&self.context);
        let mut resolved: Vec<Option<ResolvedDates>> = vec![None; self.graph.len()];
        let mut diagnostics = Vec::new();

        for &ix in self.graph.topological() {
            let node = self.graph.node(ix);

            if node.inherits_parent_window {
                let Some(parent) = node.parent.and_then(|p| resolved[p]) else {
                    continue;
                };
                resolved[ix] = Some(ResolvedDates {
                    start: parent.start,
                    end: parent.end,
                    kind: ResolutionKind::Inherited,
                });
                continue;
            }

            if node.record.is_none() && !node.has_dependencies() {
                tracing::info!(task_id = %node.id, "no linked record or dependency; using fallback dates");
                diagnostics.push(Diagnostic::MissingEvidence {
                    task_id: node.id.clone(),
                });
            }

            let dates = match resolver.resolve(node) {
                Resolution::Fixed { start, end } => ResolvedDates {
                    start,
                    end,
                    kind: ResolutionKind::FixedByStatus,
                },
                Resolution::Resolved { start, end } => {
                    let (start, end) = self.apply_delay_policy(start, end);
                    ResolvedDates {
                        start,
                        end,
                        kind: ResolutionKind::Independent,
                    }
                }
                Resolution::DependencyPending { end } => {
                    let latest_dependency_end = node
                        .dependencies
                        .iter()
                        .filter_map(|&dep| resolved[dep].map(|dates| dates.end))
                        .max();
                    let Some(latest_dependency_end) = latest_dependency_end else {
                        // Topological order guarantees every dependency is resolved.
                        continue;
                    };
                    let start = self.calendar.next_working_day_after(latest_dependency_end);
                    let (start, end) = DateResolver::duration_floor(start, end);
                    let (start, end) = self.apply_delay_policy(start, end);
                    ResolvedDates {
                        start,
                        end,
                        kind: ResolutionKind::DependencyDriven,
                    }
                }
            };

            tracing::debug!(
                task_id = %node.id,
                start = %dates.start,
                end = %dates.end,
                kind = ?dates.kind,
                "resolved task dates"
            );
            resolved[ix] = Some(dates);
        }

        (resolved, diagnostics)
    }

    fn apply_delay_policy(&self, start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        let today = self.context.today;
        if self.delay_policy.extends() && end < today {
            tracing::debug!(%end, %today, "extending overdue end date to today");
            DateResolver::duration_floor(start, today)
        } else {
            (start, end)
        }
    }
}
