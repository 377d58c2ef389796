use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque reference into the blob store.
    pub storage_ref: String,
    /// Name the file was uploaded with. May be empty.
    #[serde(default)]
    pub original_filename: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl Document {
    pub fn new(storage_ref: impl Into<String>, original_filename: impl Into<String>) -> Self {
        Self {
            storage_ref: storage_ref.into(),
            original_filename: original_filename.into(),
            uploaded_at: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Name used in prompts, logs and audit entries.
    pub fn display_name(&self) -> &str {
        if self.original_filename.trim().is_empty() {
            &self.storage_ref
        } else {
            &self.original_filename
        }
    }
}
