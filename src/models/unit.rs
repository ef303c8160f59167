use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PipelinerError, Result};
use crate::models::job::JobSpecConfigItem;

/// Snapshot of a task's config and the job's assets, handed to a unit
/// when it computes the destination of a task instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitData {
    pub config: Vec<JobSpecConfigItem>,
    pub assets: HashMap<String, String>,
}

/// Whether a hook runs before or after the task's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Pre,
    Post,
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookType::Pre => write!(f, "pre"),
            HookType::Post => write!(f, "post"),
        }
    }
}

/// Capability contract for a task kind. Variants are registered in a
/// [`UnitRegistry`] and looked up by name at adaptation time; the
/// orchestration core never branches on a concrete unit identity.
pub trait ExecutionUnit: Send + Sync {
    fn name(&self) -> &str;
    fn image(&self) -> &str;
    fn description(&self) -> &str;

    /// Compute the logical output address a task instance will produce,
    /// e.g. a table identifier. Must be pure and deterministic.
    fn generate_destination(&self, data: &UnitData) -> Result<String>;
}

/// Capability contract for a hook kind.
pub trait HookUnit: Send + Sync {
    fn name(&self) -> &str;
    fn image(&self) -> &str;
    fn description(&self) -> &str;
    fn hook_type(&self) -> HookType;

    /// Names of other hooks this one must follow. Informational metadata,
    /// not an execution schedule.
    fn depends_on(&self) -> Vec<String>;
}

/// The unit kinds this server supports, keyed by name.
#[derive(Default, Clone)]
pub struct UnitRegistry {
    tasks: HashMap<String, Arc<dyn ExecutionUnit>>,
    hooks: HashMap<String, Arc<dyn HookUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_task(&mut self, unit: Arc<dyn ExecutionUnit>) {
        self.tasks.insert(unit.name().to_string(), unit);
    }

    pub fn register_hook(&mut self, unit: Arc<dyn HookUnit>) {
        self.hooks.insert(unit.name().to_string(), unit);
    }

    pub fn task(&self, name: &str) -> Result<Arc<dyn ExecutionUnit>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelinerError::Adaptation(format!("unknown task unit: {name}")))
    }

    pub fn hook(&self, name: &str) -> Result<Arc<dyn HookUnit>> {
        self.hooks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelinerError::Adaptation(format!("unknown hook unit: {name}")))
    }
}
