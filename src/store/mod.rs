use tonic::async_trait;

use crate::error::Result;
use crate::models::{JobSpec, ProjectSpec};
use crate::progress::ObserverChain;

pub mod memory;

pub use memory::{LocalJobService, MemoryProjectRepository, MemoryPublisher};

/// Project persistence. Writes for the same project must be serialized
/// by the implementation to prevent lost updates between racing deploys.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<ProjectSpec>;
    async fn save(&self, project: ProjectSpec) -> Result<()>;
}

/// Job persistence plus synchronization with the execution backend.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn create(&self, job: JobSpec, project: &ProjectSpec) -> Result<()>;

    /// Push the project's committed jobs to the backend, emitting one
    /// upload event per job through the observer chain. Per-job failures
    /// are reported as events; only a failure of the sync itself is an
    /// error.
    async fn sync(&self, project: &ProjectSpec, observers: &ObserverChain) -> Result<()>;

    async fn get_by_name(&self, name: &str, project: &ProjectSpec) -> Result<JobSpec>;
}

/// Downstream consumer of compiled metadata records. Delivery guarantees
/// are its own concern.
pub trait MetadataPublisher: Send + Sync {
    fn publish(&self, key: Vec<u8>, message: Vec<u8>) -> Result<()>;
}
