use thiserror::Error;

use crate::checklist::Category;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("No document at index {index} in category '{category}'")]
    DocumentIndex { category: Category, index: usize },

    #[error("Stored job '{id}' is unreadable: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Failed to serialize job data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Store task failed: {0}")]
    Task(String),
}
