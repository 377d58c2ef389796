use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job store failed: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => PipelineError::JobNotFound(id),
            other => PipelineError::Store(other),
        }
    }
}
