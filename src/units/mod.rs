//! Built-in execution and hook units. Registered at server startup;
//! embedding applications can register additional kinds.

use std::sync::Arc;

use crate::error::{PipelinerError, Result};
use crate::models::{ExecutionUnit, HookType, HookUnit, UnitData, UnitRegistry};

/// SQL transformation task. The destination table is assembled from the
/// PROJECT, DATASET and TABLE config entries.
pub struct SqlTransformTask;

impl SqlTransformTask {
    fn config<'a>(data: &'a UnitData, key: &str) -> Result<&'a str> {
        data.config
            .iter()
            .find(|c| c.name == key)
            .map(|c| c.value.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                PipelinerError::DestinationResolution(format!("missing {key} config"))
            })
    }
}

impl ExecutionUnit for SqlTransformTask {
    fn name(&self) -> &str {
        "sql_transform"
    }

    fn image(&self) -> &str {
        "pipeliner/sql-transform:latest"
    }

    fn description(&self) -> &str {
        "SQL transformation over a warehouse table"
    }

    fn generate_destination(&self, data: &UnitData) -> Result<String> {
        Ok(format!(
            "{}.{}.{}",
            Self::config(data, "PROJECT")?,
            Self::config(data, "DATASET")?,
            Self::config(data, "TABLE")?
        ))
    }
}

/// Post-execution hook that ships produced records onto the message bus.
pub struct TransporterHook;

impl HookUnit for TransporterHook {
    fn name(&self) -> &str {
        "transporter"
    }

    fn image(&self) -> &str {
        "pipeliner/transporter:latest"
    }

    fn description(&self) -> &str {
        "publishes produced records to the message bus"
    }

    fn hook_type(&self) -> HookType {
        HookType::Post
    }

    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Registry pre-loaded with the built-in units.
pub fn default_registry() -> UnitRegistry {
    let mut registry = UnitRegistry::new();
    registry.register_task(Arc::new(SqlTransformTask));
    registry.register_hook(Arc::new(TransporterHook));
    registry
}
