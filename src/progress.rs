use std::sync::Arc;

/// Deploy-progress events emitted by the job service while syncing a
/// project with the execution backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Backend sync started for a project.
    SyncStart { project: String, jobs: usize },
    /// One job finished uploading, successfully or not.
    JobUpload {
        name: String,
        error: Option<String>,
    },
}

/// A listener for deploy-progress events. May be invoked from a
/// different execution context than the request handler.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Ordered set of listeners, each invoked synchronously per event.
#[derive(Default, Clone)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }
}

impl Observer for ObserverChain {
    fn notify(&self, event: &Event) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}

/// Caller-agnostic observer that records deploy progress in the server
/// log.
pub struct LogProgressObserver;

impl Observer for LogProgressObserver {
    fn notify(&self, event: &Event) {
        match event {
            Event::SyncStart { project, jobs } => {
                tracing::info!(project = %project, jobs, "backend sync started");
            }
            Event::JobUpload { name, error: None } => {
                tracing::info!(job = %name, "job uploaded");
            }
            Event::JobUpload {
                name,
                error: Some(err),
            } => {
                tracing::warn!(job = %name, error = %err, "job upload failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Observer for Recorder {
        fn notify(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn chain_fans_out_to_all_observers_in_order() {
        let first = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });
        let second = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });

        let mut chain = ObserverChain::new();
        chain.join(first.clone());
        chain.join(second.clone());

        let event = Event::JobUpload {
            name: "job-1".to_string(),
            error: None,
        };
        chain.notify(&event);

        assert_eq!(first.events.lock().unwrap().as_slice(), &[event.clone()]);
        assert_eq!(second.events.lock().unwrap().as_slice(), &[event]);
    }

    #[test]
    fn empty_chain_is_a_no_op() {
        let chain = ObserverChain::new();
        chain.notify(&Event::SyncStart {
            project: "proj".to_string(),
            jobs: 0,
        });
    }
}
