use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::project::ProjectSpec;
use crate::models::unit::{ExecutionUnit, HookType, HookUnit};

/// Serialize a `chrono::Duration` as whole seconds. Offsets may be
/// negative, so a signed representation is required.
pub mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.num_seconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(d)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecLabelItem {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecConfigItem {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecBehavior {
    /// Backfill missed schedule intervals since the start date.
    pub catch_up: bool,
    /// Hold a run until the prior scheduled run has completed.
    pub depends_on_past: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecSchedule {
    pub start_date: DateTime<Utc>,
    /// Cron-like schedule expression, kept opaque at this layer.
    pub interval: String,
}

/// The data-time range a task instance is expected to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecTaskWindow {
    #[serde(with = "duration_secs")]
    pub size: Duration,
    #[serde(with = "duration_secs")]
    pub offset: Duration,
    /// Calendar granularity token, e.g. "d" for day.
    pub truncate_to: String,
}

impl Default for JobSpecTaskWindow {
    fn default() -> Self {
        Self {
            size: Duration::hours(24),
            offset: Duration::zero(),
            truncate_to: "d".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct JobSpecTask {
    pub unit: Arc<dyn ExecutionUnit>,
    pub config: Vec<JobSpecConfigItem>,
    /// Higher runs preferentially when resources are constrained.
    pub priority: i32,
    pub window: JobSpecTaskWindow,
}

impl fmt::Debug for JobSpecTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpecTask")
            .field("unit", &self.unit.name())
            .field("config", &self.config)
            .field("priority", &self.priority)
            .field("window", &self.window)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpecAsset {
    pub name: String,
    pub value: String,
}

/// Named file-like payloads attached to a job, e.g. query text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAssets {
    items: Vec<JobSpecAsset>,
}

impl JobAssets {
    pub fn new(items: Vec<JobSpecAsset>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[JobSpecAsset] {
        &self.items
    }

    /// Project the assets into a name → content mapping for unit
    /// consumption.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSpecDependencyType {
    Intra,
    Inter,
}

impl fmt::Display for JobSpecDependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSpecDependencyType::Intra => write!(f, "intra"),
            JobSpecDependencyType::Inter => write!(f, "inter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSpecDependency {
    /// None means the dependency lives in the same project.
    pub project: Option<ProjectSpec>,
    pub job: String,
    pub dep_type: JobSpecDependencyType,
}

#[derive(Clone)]
pub struct JobSpecHook {
    pub unit: Arc<dyn HookUnit>,
    pub config: Vec<JobSpecConfigItem>,
}

impl fmt::Debug for JobSpecHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpecHook")
            .field("unit", &self.unit.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Canonical definition of one schedulable unit of work. Pure data; all
/// validation against collaborators happens downstream.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub owner: String,
    /// Monotonic, incremented on redeploy.
    pub version: i32,
    pub description: String,
    pub labels: Vec<JobSpecLabelItem>,
    pub behavior: JobSpecBehavior,
    pub schedule: JobSpecSchedule,
    pub task: JobSpecTask,
    pub assets: JobAssets,
    /// Keyed by referenced job name; ordered so that compiled metadata
    /// is byte-deterministic.
    pub dependencies: BTreeMap<String, JobSpecDependency>,
    pub hooks: Vec<JobSpecHook>,
}

// ---------------------------------------------------------------------------
// Derived catalog metadata. Created fresh on every compile, never mutated;
// a redeploy supersedes the record under the same urn with a new version.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobTaskMetadata {
    pub name: String,
    pub image: String,
    pub description: String,
    pub destination: String,
    pub config: Vec<JobSpecConfigItem>,
    pub window: JobSpecTaskWindow,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDependencyMetadata {
    pub tenant: String,
    pub job: String,
    #[serde(rename = "type")]
    pub dep_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHookMetadata {
    pub name: String,
    pub image: String,
    pub description: String,
    pub config: Vec<JobSpecConfigItem>,
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobMetadata {
    pub urn: String,
    pub name: String,
    pub tenant: String,
    pub version: i32,
    pub description: String,
    pub labels: Vec<JobSpecLabelItem>,
    pub owner: String,
    pub task: JobTaskMetadata,
    pub schedule: JobSpecSchedule,
    pub behavior: JobSpecBehavior,
    pub dependencies: Vec<JobDependencyMetadata>,
    pub hooks: Vec<JobHookMetadata>,
}
