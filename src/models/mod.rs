pub mod job;
pub mod project;
pub mod unit;

pub use job::{
    JobAssets, JobDependencyMetadata, JobHookMetadata, JobMetadata, JobSpec, JobSpecAsset,
    JobSpecBehavior, JobSpecConfigItem, JobSpecDependency, JobSpecDependencyType, JobSpecHook,
    JobSpecLabelItem, JobSpecSchedule, JobSpecTask, JobSpecTaskWindow, JobTaskMetadata,
};
pub use project::ProjectSpec;
pub use unit::{ExecutionUnit, HookType, HookUnit, UnitData, UnitRegistry};
