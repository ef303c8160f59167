pub mod config;
pub mod error;
pub mod grpc;
pub mod meta;
pub mod models;
pub mod progress;
pub mod shutdown;
pub mod store;
pub mod units;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("pipeliner");
}
