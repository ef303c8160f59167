use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelinerError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("adaptation failed: {0}")]
    Adaptation(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("sync failed: {0}")]
    Sync(String),

    #[error("cannot resolve destination: {0}")]
    DestinationResolution(String),

    #[error("invalid dependency: {0}")]
    InvalidDependency(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelinerError>;

impl From<PipelinerError> for tonic::Status {
    fn from(err: PipelinerError) -> Self {
        match &err {
            PipelinerError::ProjectNotFound(_) | PipelinerError::JobNotFound(_) => {
                tonic::Status::not_found(err.to_string())
            }
            PipelinerError::Adaptation(_) | PipelinerError::InvalidDependency(_) => {
                tonic::Status::invalid_argument(err.to_string())
            }
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
