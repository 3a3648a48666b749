use super::PersistenceResult;
use crate::config::ScheduleConfig;
use crate::schedule::ScheduleEntry;
use crate::task::{ExternalRecord, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Everything the demo binary needs for one run, as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub config: ScheduleConfig,
    /// Overrides the system date when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub records: BTreeMap<String, ExternalRecord>,
}

impl ProjectInput {
    pub fn from_json_str(json: &str) -> PersistenceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ProjectInput> {
    let file = File::open(path)?;
    let project: ProjectInput = serde_json::from_reader(BufReader::new(file))?;
    Ok(project)
}

pub fn save_entries_to_json<P: AsRef<Path>>(
    entries: &[ScheduleEntry],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, entries)?;
    Ok(())
}
