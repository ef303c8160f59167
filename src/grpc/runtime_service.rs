use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::grpc::adapter::ProtoAdapter;
use crate::progress::{Event, Observer, ObserverChain};
use crate::proto;
use crate::proto::runtime_service_server::RuntimeService;
use crate::store::{JobService, ProjectRepository};

/// The deployment synchronizer behind the control-plane RPC surface.
///
/// A deploy request walks resolve-project, adapt-and-persist per job,
/// backend sync, then streams one acknowledgment per job back to the
/// caller. Setup failures abort the whole request; once sync begins,
/// per-job failures surface as negative acknowledgments only.
pub struct RuntimeServiceImpl {
    config: ServerConfig,
    project_repo: Arc<dyn ProjectRepository>,
    job_service: Arc<dyn JobService>,
    adapter: ProtoAdapter,
    progress_observer: Arc<dyn Observer>,
}

impl RuntimeServiceImpl {
    pub fn new(
        config: ServerConfig,
        project_repo: Arc<dyn ProjectRepository>,
        job_service: Arc<dyn JobService>,
        adapter: ProtoAdapter,
        progress_observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            config,
            project_repo,
            job_service,
            adapter,
            progress_observer,
        }
    }
}

type AckStream =
    UnboundedReceiverStream<Result<proto::DeploySpecificationResponse, Status>>;

#[tonic::async_trait]
impl RuntimeService for RuntimeServiceImpl {
    type DeploySpecificationStream = AckStream;

    async fn version(
        &self,
        request: Request<proto::VersionRequest>,
    ) -> Result<Response<proto::VersionResponse>, Status> {
        let req = request.into_inner();
        tracing::info!(client = %req.client, "version requested");

        Ok(Response::new(proto::VersionResponse {
            server: self.config.version.clone(),
        }))
    }

    async fn deploy_specification(
        &self,
        request: Request<proto::DeploySpecificationRequest>,
    ) -> Result<Response<Self::DeploySpecificationStream>, Status> {
        let req = request.into_inner();
        let deploy_id = Uuid::new_v4();

        let project = self.project_repo.get_by_name(&req.project_name).await?;

        tracing::info!(
            %deploy_id,
            project = %project.name,
            jobs = req.jobs.len(),
            "deploy started"
        );

        // Setup stage: a failure here aborts the whole request before any
        // acknowledgment is streamed. Work already persisted stays.
        for job_proto in &req.jobs {
            let job = self.adapter.from_job_proto(job_proto)?;
            self.job_service.create(job, &project).await?;
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let mut observers = ObserverChain::new();
        observers.join(self.progress_observer.clone());
        observers.join(Arc::new(StreamAckObserver { tx: tx.clone() }));

        let job_service = self.job_service.clone();
        tokio::spawn(async move {
            match job_service.sync(&project, &observers).await {
                Ok(()) => {
                    tracing::info!(%deploy_id, "deploy finished");
                }
                Err(e) => {
                    tracing::error!(%deploy_id, error = %e, "backend sync failed");
                    let _ = tx.send(Err(Status::from(e)));
                }
            }
        });

        Ok(Response::new(UnboundedReceiverStream::new(rx)))
    }

    async fn register_project(
        &self,
        request: Request<proto::RegisterProjectRequest>,
    ) -> Result<Response<proto::RegisterProjectResponse>, Status> {
        let req = request.into_inner();
        let project_proto = req
            .project
            .ok_or_else(|| Status::invalid_argument("project is required"))?;

        let project = self.adapter.from_project_proto(&project_proto);
        tracing::info!(project = %project.name, "registering project");
        self.project_repo.save(project).await?;

        Ok(Response::new(proto::RegisterProjectResponse {
            success: true,
            message: "saved successfully".to_string(),
        }))
    }

    async fn get_job(
        &self,
        request: Request<proto::GetJobRequest>,
    ) -> Result<Response<proto::GetJobResponse>, Status> {
        let req = request.into_inner();

        let project = self.project_repo.get_by_name(&req.project_name).await?;
        let job = self.job_service.get_by_name(&req.job_name, &project).await?;

        Ok(Response::new(proto::GetJobResponse {
            project: Some(self.adapter.to_project_proto(&project)),
            job: Some(self.adapter.to_job_proto(&job)),
        }))
    }
}

/// Relays job upload events onto the RPC response stream. The channel
/// enforces single-writer discipline on the outbound stream; send
/// failures mean the caller went away and are logged, not escalated.
struct StreamAckObserver {
    tx: mpsc::UnboundedSender<Result<proto::DeploySpecificationResponse, Status>>,
}

impl Observer for StreamAckObserver {
    fn notify(&self, event: &Event) {
        // Other event kinds are server-side only.
        if let Event::JobUpload { name, error } = event {
            let ack = proto::DeploySpecificationResponse {
                job_name: name.clone(),
                success: error.is_none(),
                message: error.clone().unwrap_or_default(),
            };
            if self.tx.send(Ok(ack)).is_err() {
                tracing::warn!(job = %name, "failed to send deploy ack, caller gone");
            }
        }
    }
}
