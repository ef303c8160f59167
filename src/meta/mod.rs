pub mod job_adapter;

pub use job_adapter::JobAdapter;
