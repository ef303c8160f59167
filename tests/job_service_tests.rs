use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};

use pipeliner::models::{
    JobAssets, JobSpec, JobSpecBehavior, JobSpecConfigItem, JobSpecSchedule, JobSpecTask,
    JobSpecTaskWindow, ProjectSpec,
};
use pipeliner::progress::{Event, Observer, ObserverChain};
use pipeliner::store::{JobService, LocalJobService, MemoryPublisher};
use pipeliner::units::SqlTransformTask;

struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl Observer for Recorder {
    fn notify(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn config(entries: &[(&str, &str)]) -> Vec<JobSpecConfigItem> {
    entries
        .iter()
        .map(|(name, value)| JobSpecConfigItem {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
}

/// A job whose sql_transform destination resolves to `warehouse.raw.<table>`.
fn job(name: &str, table: &str) -> JobSpec {
    JobSpec {
        name: name.to_string(),
        owner: "data-eng@example.com".to_string(),
        version: 1,
        description: String::new(),
        labels: vec![],
        behavior: JobSpecBehavior {
            catch_up: true,
            depends_on_past: false,
        },
        schedule: JobSpecSchedule {
            start_date: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
            interval: "0 * * * *".to_string(),
        },
        task: JobSpecTask {
            unit: Arc::new(SqlTransformTask),
            config: config(&[
                ("PROJECT", "warehouse"),
                ("DATASET", "raw"),
                ("TABLE", table),
            ]),
            priority: 100,
            window: JobSpecTaskWindow {
                size: Duration::hours(1),
                offset: Duration::zero(),
                truncate_to: "h".to_string(),
            },
        },
        assets: JobAssets::new(vec![]),
        dependencies: BTreeMap::new(),
        hooks: vec![],
    }
}

/// A job that persists fine but fails destination resolution at sync.
fn broken_job(name: &str) -> JobSpec {
    let mut job = job(name, "unused");
    job.task.config.retain(|c| c.name != "TABLE");
    job
}

fn chain(recorder: Arc<Recorder>) -> ObserverChain {
    let mut chain = ObserverChain::new();
    chain.join(recorder);
    chain
}

#[tokio::test]
async fn test_sync_emits_one_upload_event_per_job_in_name_order() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher.clone());
    let project = ProjectSpec::new("analytics");

    service.create(job("job-b", "b"), &project).await.unwrap();
    service.create(job("job-a", "a"), &project).await.unwrap();

    let recorder = Recorder::new();
    service.sync(&project, &chain(recorder.clone())).await.unwrap();

    let events = recorder.events();
    assert_eq!(
        events[0],
        Event::SyncStart {
            project: "analytics".to_string(),
            jobs: 2,
        }
    );
    assert_eq!(
        events[1],
        Event::JobUpload {
            name: "job-a".to_string(),
            error: None,
        }
    );
    assert_eq!(
        events[2],
        Event::JobUpload {
            name: "job-b".to_string(),
            error: None,
        }
    );

    assert_eq!(publisher.records().len(), 2);
}

#[tokio::test]
async fn test_sync_isolates_per_job_failures() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher.clone());
    let project = ProjectSpec::new("analytics");

    service.create(broken_job("job-bad"), &project).await.unwrap();
    service.create(job("job-good", "events"), &project).await.unwrap();

    let recorder = Recorder::new();
    service.sync(&project, &chain(recorder.clone())).await.unwrap();

    let events = recorder.events();
    let mut successes = 0;
    let mut failures = 0;
    for event in &events {
        if let Event::JobUpload { name, error } = event {
            match error {
                None => {
                    successes += 1;
                    assert_eq!(name, "job-good");
                }
                Some(message) => {
                    failures += 1;
                    assert_eq!(name, "job-bad");
                    assert!(message.contains("TABLE"));
                }
            }
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(failures, 1);

    // Only the good job reached the publication channel.
    assert_eq!(publisher.records().len(), 1);
}

#[tokio::test]
async fn test_published_bytes_are_deterministic_across_syncs() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher.clone());
    let project = ProjectSpec::new("analytics");

    service.create(job("job-a", "events"), &project).await.unwrap();

    service.sync(&project, &ObserverChain::new()).await.unwrap();
    service.sync(&project, &ObserverChain::new()).await.unwrap();

    let records = publisher.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}

#[tokio::test]
async fn test_redeploy_overwrites_the_committed_job() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher);
    let project = ProjectSpec::new("analytics");

    let mut first = job("job-a", "events");
    first.version = 1;
    service.create(first, &project).await.unwrap();

    let mut second = job("job-a", "events");
    second.version = 2;
    service.create(second, &project).await.unwrap();

    let committed = service.get_by_name("job-a", &project).await.unwrap();
    assert_eq!(committed.version, 2);
}

#[tokio::test]
async fn test_create_rejects_a_nameless_job() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher);
    let project = ProjectSpec::new("analytics");

    let result = service.create(job("", "events"), &project).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_sync_of_an_empty_project_completes_cleanly() {
    let publisher = Arc::new(MemoryPublisher::new());
    let service = LocalJobService::new(publisher.clone());
    let project = ProjectSpec::new("empty");

    let recorder = Recorder::new();
    service.sync(&project, &chain(recorder.clone())).await.unwrap();

    assert_eq!(
        recorder.events(),
        vec![Event::SyncStart {
            project: "empty".to_string(),
            jobs: 0,
        }]
    );
    assert!(publisher.records().is_empty());
}
