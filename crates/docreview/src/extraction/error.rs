use std::time::Duration;

use thiserror::Error;

/// Errors from one structured extraction unit of work.
///
/// These never cross the `FieldExtractor` boundary; they are rendered into
/// the per-document or per-category error marker instead.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cannot reach extraction gateway at {0}")]
    Connection(String),

    #[error("Extraction gateway returned HTTP {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed extraction response: {0}")]
    Malformed(String),

    #[error("Response does not match schema '{schema}': {errors}")]
    SchemaMismatch { schema: String, errors: String },

    #[error("Failed to read document '{name}': {reason}")]
    Document { name: String, reason: String },
}

impl ExtractionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExtractionError::Timeout(_))
    }
}
