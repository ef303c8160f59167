use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tonic::async_trait;

use crate::error::{PipelinerError, Result};
use crate::meta::JobAdapter;
use crate::models::{JobSpec, ProjectSpec};
use crate::progress::{Event, Observer, ObserverChain};
use crate::store::{JobService, MetadataPublisher, ProjectRepository};

/// Project store backed by process memory. The write lock serializes
/// saves, so racing deploys for one project cannot lose updates.
#[derive(Default)]
pub struct MemoryProjectRepository {
    projects: RwLock<HashMap<String, ProjectSpec>>,
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn get_by_name(&self, name: &str) -> Result<ProjectSpec> {
        self.projects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| PipelinerError::ProjectNotFound(name.to_string()))
    }

    async fn save(&self, project: ProjectSpec) -> Result<()> {
        if project.name.is_empty() {
            return Err(PipelinerError::Persistence(
                "project name is empty".to_string(),
            ));
        }
        self.projects
            .write()
            .await
            .insert(project.name.clone(), project);
        Ok(())
    }
}

/// Collects published metadata records in memory.
#[derive(Default)]
pub struct MemoryPublisher {
    records: std::sync::Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MetadataPublisher for MemoryPublisher {
    fn publish(&self, key: Vec<u8>, message: Vec<u8>) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((key, message));
        Ok(())
    }
}

/// Job persistence and backend synchronization backed by process memory.
///
/// Sync compiles each committed job into its catalog metadata record and
/// hands the keyed message to the publication channel, emitting one
/// upload event per job. A failing job yields a negative event and does
/// not abort its siblings.
pub struct LocalJobService {
    // project name -> job name -> spec; inner map ordered so sync walks
    // jobs in a stable order
    jobs: RwLock<HashMap<String, BTreeMap<String, JobSpec>>>,
    adapter: JobAdapter,
    publisher: Arc<dyn MetadataPublisher>,
}

impl LocalJobService {
    pub fn new(publisher: Arc<dyn MetadataPublisher>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            adapter: JobAdapter,
            publisher,
        }
    }

    fn upload(&self, project: &ProjectSpec, job: &JobSpec) -> Result<()> {
        let metadata = self.adapter.from_job_spec(project, job)?;
        let key = self.adapter.compile_key(&job.name)?;
        let message = self.adapter.compile_message(&metadata)?;
        self.publisher.publish(key, message)
    }
}

#[async_trait]
impl JobService for LocalJobService {
    async fn create(&self, job: JobSpec, project: &ProjectSpec) -> Result<()> {
        if job.name.is_empty() {
            return Err(PipelinerError::Persistence("job name is empty".to_string()));
        }
        let mut jobs = self.jobs.write().await;
        jobs.entry(project.name.clone())
            .or_default()
            .insert(job.name.clone(), job);
        Ok(())
    }

    async fn sync(&self, project: &ProjectSpec, observers: &ObserverChain) -> Result<()> {
        let jobs: Vec<JobSpec> = {
            let guard = self.jobs.read().await;
            guard
                .get(&project.name)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default()
        };

        observers.notify(&Event::SyncStart {
            project: project.name.clone(),
            jobs: jobs.len(),
        });

        for job in &jobs {
            let error = self.upload(project, job).err().map(|e| e.to_string());
            if let Some(err) = &error {
                tracing::warn!(project = %project.name, job = %job.name, error = %err, "job upload failed");
            }
            observers.notify(&Event::JobUpload {
                name: job.name.clone(),
                error,
            });
        }

        Ok(())
    }

    async fn get_by_name(&self, name: &str, project: &ProjectSpec) -> Result<JobSpec> {
        self.jobs
            .read()
            .await
            .get(&project.name)
            .and_then(|m| m.get(name))
            .cloned()
            .ok_or_else(|| PipelinerError::JobNotFound(name.to_string()))
    }
}
