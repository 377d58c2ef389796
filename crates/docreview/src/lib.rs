pub mod checklist;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod processor;
pub mod review;
pub mod secrets;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod validator;

pub use checklist::{Category, Checklist, Document, Job, JobStatus};
pub use config::{load_config, Config};
pub use error::{ConfigError, DocReviewError, ProcessError, Result, StorageError};
pub use extraction::{ExtractionError, FieldExtractor};
pub use pipeline::{PipelineConfig, PipelineContext, PipelineError, ReviewPipeline};
pub use review::{reconcile, Review};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use store::{JobStore, MemoryJobStore, SqliteJobStore, StoreError};
pub use validator::{validate, ReviewOutcome, ValidationResult};
