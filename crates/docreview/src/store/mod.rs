//! Job persistence.
//!
//! The pipeline only needs `get` and `replace_review`; the concrete stores
//! also carry the job and document helpers used by the surrounding layer.

mod error;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::checklist::Job;
use crate::review::Review;

pub use error::StoreError;
pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Result<Job, StoreError>;

    /// Replaces the job's review wholesale, recomputes its status from the
    /// review's final outcome and returns the updated job.
    async fn replace_review(&self, job_id: &str, review: Review) -> Result<Job, StoreError>;
}
