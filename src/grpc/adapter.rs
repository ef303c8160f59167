use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::{PipelinerError, Result};
use crate::models::{
    JobAssets, JobSpec, JobSpecAsset, JobSpecBehavior, JobSpecConfigItem, JobSpecDependency,
    JobSpecDependencyType, JobSpecHook, JobSpecLabelItem, JobSpecSchedule, JobSpecTask,
    JobSpecTaskWindow, ProjectSpec, UnitRegistry,
};
use crate::proto;

/// Maps between wire definitions and the model in both directions.
/// Mapping failures surface as errors, never as silently dropped fields.
#[derive(Clone)]
pub struct ProtoAdapter {
    registry: Arc<UnitRegistry>,
}

impl ProtoAdapter {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }

    pub fn from_project_proto(&self, project: &proto::ProjectSpecification) -> ProjectSpec {
        ProjectSpec {
            name: project.name.clone(),
            config: project.config.clone().into_iter().collect(),
        }
    }

    pub fn to_project_proto(&self, project: &ProjectSpec) -> proto::ProjectSpecification {
        proto::ProjectSpecification {
            name: project.name.clone(),
            config: project.config.clone().into_iter().collect(),
        }
    }

    pub fn from_job_proto(&self, job: &proto::JobSpecification) -> Result<JobSpec> {
        if job.name.is_empty() {
            return Err(PipelinerError::Adaptation("job name is empty".to_string()));
        }

        let unit = self.registry.task(&job.task_name)?;

        let start_date = DateTime::parse_from_rfc3339(&job.start_date)
            .map_err(|e| {
                PipelinerError::Adaptation(format!(
                    "invalid start date {:?}: {e}",
                    job.start_date
                ))
            })?
            .with_timezone(&Utc);

        let window = match &job.window {
            Some(w) => JobSpecTaskWindow {
                size: Duration::seconds(w.size_secs),
                offset: Duration::seconds(w.offset_secs),
                truncate_to: w.truncate_to.clone(),
            },
            None => JobSpecTaskWindow::default(),
        };

        let mut dependencies = BTreeMap::new();
        for dep in &job.dependencies {
            if dep.job_name.is_empty() {
                return Err(PipelinerError::InvalidDependency(format!(
                    "dependency of {} is missing a job name",
                    job.name
                )));
            }
            // A dependency naming another project is inter-project; absence
            // of a project means it lives in the deploying project.
            let (project, dep_type) = if dep.project_name.is_empty() {
                (None, JobSpecDependencyType::Intra)
            } else {
                (
                    Some(ProjectSpec::new(dep.project_name.clone())),
                    JobSpecDependencyType::Inter,
                )
            };
            dependencies.insert(
                dep.job_name.clone(),
                JobSpecDependency {
                    project,
                    job: dep.job_name.clone(),
                    dep_type,
                },
            );
        }

        let hooks = job
            .hooks
            .iter()
            .map(|hook| {
                Ok(JobSpecHook {
                    unit: self.registry.hook(&hook.name)?,
                    config: config_from_proto(&hook.config),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(JobSpec {
            name: job.name.clone(),
            owner: job.owner.clone(),
            version: job.version,
            description: job.description.clone(),
            labels: job
                .labels
                .iter()
                .map(|l| JobSpecLabelItem {
                    name: l.name.clone(),
                    value: l.value.clone(),
                })
                .collect(),
            behavior: JobSpecBehavior {
                catch_up: job.catch_up,
                depends_on_past: job.depends_on_past,
            },
            schedule: JobSpecSchedule {
                start_date,
                interval: job.interval.clone(),
            },
            task: JobSpecTask {
                unit,
                config: config_from_proto(&job.config),
                priority: job.priority,
                window,
            },
            assets: JobAssets::new(
                job.assets
                    .iter()
                    .map(|a| JobSpecAsset {
                        name: a.name.clone(),
                        value: a.value.clone(),
                    })
                    .collect(),
            ),
            dependencies,
            hooks,
        })
    }

    pub fn to_job_proto(&self, job: &JobSpec) -> proto::JobSpecification {
        proto::JobSpecification {
            name: job.name.clone(),
            owner: job.owner.clone(),
            version: job.version,
            description: job.description.clone(),
            labels: job
                .labels
                .iter()
                .map(|l| proto::LabelEntry {
                    name: l.name.clone(),
                    value: l.value.clone(),
                })
                .collect(),
            catch_up: job.behavior.catch_up,
            depends_on_past: job.behavior.depends_on_past,
            start_date: job.schedule.start_date.to_rfc3339(),
            interval: job.schedule.interval.clone(),
            task_name: job.task.unit.name().to_string(),
            config: config_to_proto(&job.task.config),
            priority: job.task.priority,
            window: Some(proto::TaskWindow {
                size_secs: job.task.window.size.num_seconds(),
                offset_secs: job.task.window.offset.num_seconds(),
                truncate_to: job.task.window.truncate_to.clone(),
            }),
            assets: job
                .assets
                .items()
                .iter()
                .map(|a| proto::AssetEntry {
                    name: a.name.clone(),
                    value: a.value.clone(),
                })
                .collect(),
            dependencies: job
                .dependencies
                .values()
                .map(|dep| proto::JobDependency {
                    job_name: dep.job.clone(),
                    project_name: dep
                        .project
                        .as_ref()
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                })
                .collect(),
            hooks: job
                .hooks
                .iter()
                .map(|hook| proto::JobHook {
                    name: hook.unit.name().to_string(),
                    config: config_to_proto(&hook.config),
                })
                .collect(),
        }
    }
}

fn config_from_proto(entries: &[proto::ConfigEntry]) -> Vec<JobSpecConfigItem> {
    entries
        .iter()
        .map(|c| JobSpecConfigItem {
            name: c.name.clone(),
            value: c.value.clone(),
        })
        .collect()
}

fn config_to_proto(entries: &[JobSpecConfigItem]) -> Vec<proto::ConfigEntry> {
    entries
        .iter()
        .map(|c| proto::ConfigEntry {
            name: c.name.clone(),
            value: c.value.clone(),
        })
        .collect()
}
