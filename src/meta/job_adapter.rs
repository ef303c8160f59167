use serde::Serialize;

use crate::error::{PipelinerError, Result};
use crate::models::{
    JobDependencyMetadata, JobHookMetadata, JobMetadata, JobSpec, JobTaskMetadata, ProjectSpec,
    UnitData,
};

/// Compiles a mutable job specification into an immutable catalog
/// metadata record, plus the keyed message bytes handed to the
/// publication channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobAdapter;

#[derive(Serialize)]
struct MetadataKey<'a> {
    job: &'a str,
}

impl JobAdapter {
    /// Derive the catalog record for one deploy of a job version.
    ///
    /// Never returns a partial record: any failure (destination
    /// resolution, unresolvable dependency) discards the whole result.
    pub fn from_job_spec(&self, project: &ProjectSpec, job: &JobSpec) -> Result<JobMetadata> {
        let destination = job.task.unit.generate_destination(&UnitData {
            config: job.task.config.clone(),
            assets: job.assets.to_map(),
        })?;

        let mut dependencies = Vec::with_capacity(job.dependencies.len());
        for (name, dep) in &job.dependencies {
            if dep.job.is_empty() && dep.project.is_none() {
                return Err(PipelinerError::InvalidDependency(format!(
                    "dependency {name} has neither a job name nor a project"
                )));
            }
            // An intra-project dependency resolves to the current project.
            let tenant = dep
                .project
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| project.name.clone());
            dependencies.push(JobDependencyMetadata {
                tenant,
                job: dep.job.clone(),
                dep_type: dep.dep_type.to_string(),
            });
        }

        // Insertion order of hooks is preserved; dependency ordering among
        // hooks is carried verbatim as informational metadata.
        let hooks = job
            .hooks
            .iter()
            .map(|hook| JobHookMetadata {
                name: hook.unit.name().to_string(),
                image: hook.unit.image().to_string(),
                description: hook.unit.description().to_string(),
                config: hook.config.clone(),
                hook_type: hook.unit.hook_type(),
                depends_on: hook.unit.depends_on(),
            })
            .collect();

        Ok(JobMetadata {
            urn: format!("{}::job/{}", project.name, job.name),
            name: job.name.clone(),
            tenant: project.name.clone(),
            version: job.version,
            description: job.description.clone(),
            labels: job.labels.clone(),
            owner: job.owner.clone(),
            task: JobTaskMetadata {
                name: job.task.unit.name().to_string(),
                image: job.task.unit.image().to_string(),
                description: job.task.unit.description().to_string(),
                destination,
                config: job.task.config.clone(),
                window: job.task.window.clone(),
                priority: job.task.priority,
            },
            schedule: job.schedule.clone(),
            behavior: job.behavior,
            dependencies,
            hooks,
        })
    }

    /// Routing key for downstream partitioning. Identical input always
    /// yields identical bytes.
    pub fn compile_key(&self, job_name: &str) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&MetadataKey { job: job_name })?)
    }

    /// Serialize the full metadata record. Identical input always yields
    /// identical bytes, which downstream consumers rely on for
    /// deduplication.
    pub fn compile_message(&self, metadata: &JobMetadata) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(metadata)?)
    }
}
