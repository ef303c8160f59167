pub mod adapter;
pub mod runtime_service;
pub mod server;

pub use server::GrpcServer;
