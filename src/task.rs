use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Done,
    InProgress,
    Pending,
    Blocked,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Done => "done",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Pending => "pending",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Unknown => "unknown",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = std::convert::Infallible;

    /// Unrecognised values map to `Unknown` rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Ok(match normalized.as_str() {
            "done" | "completed" | "closed" => TaskStatus::Done,
            "in-progress" | "active" => TaskStatus::InProgress,
            "pending" | "todo" | "open" => TaskStatus::Pending,
            "blocked" => TaskStatus::Blocked,
            _ => TaskStatus::Unknown,
        })
    }
}

/// One entry of a checklist embedded in a record's description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub done: bool,
    pub label: String,
}

impl ChecklistItem {
    pub fn new(done: bool, label: impl Into<String>) -> Self {
        Self {
            done,
            label: label.into(),
        }
    }
}

/// Evidence from an external issue tracker, already normalized to dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Checklist parsed out of `description` by the tracker collaborator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,
}

impl ExternalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(mut self, date: NaiveDate) -> Self {
        self.created_at = Some(date);
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn closed(mut self, date: NaiveDate) -> Self {
        self.closed_at = Some(date);
        self
    }

    pub fn with_checklist<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = ChecklistItem>,
    {
        self.checklist = items.into_iter().collect();
        self
    }
}

/// A unit of work as supplied by the task-source collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Record linked directly on the task; a record supplied through the
    /// tracker mapping takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ExternalRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Task>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Unknown,
            dependencies: Vec::new(),
            record: None,
            subtasks: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_record(mut self, record: ExternalRecord) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_subtask(mut self, subtask: Task) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// Id of the enclosing task for hierarchical `parent.child` ids.
    pub fn parent_id(id: &str) -> Option<&str> {
        id.rsplit_once('.').map(|(parent, _)| parent)
    }
}
