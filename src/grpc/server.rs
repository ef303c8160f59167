use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::grpc::runtime_service::RuntimeServiceImpl;
use crate::proto::runtime_service_server::RuntimeServiceServer;

pub struct GrpcServer {
    addr: SocketAddr,
    service: RuntimeServiceImpl,
}

impl GrpcServer {
    pub fn new(addr: SocketAddr, service: RuntimeServiceImpl) -> Self {
        Self { addr, service }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<(), tonic::transport::Error> {
        tracing::info!(addr = %self.addr, "starting gRPC server");

        Server::builder()
            .add_service(RuntimeServiceServer::new(self.service))
            .serve_with_shutdown(self.addr, shutdown.cancelled_owned())
            .await
    }
}
