//! Field extraction per checklist category.
//!
//! `FieldExtractor` never returns an error to its caller: unreadable
//! documents are skipped, and collaborator failures are folded into the
//! category result as an error marker.

pub mod client;
mod error;
pub mod invoices;
pub mod job_order;
pub mod media_plan;
pub mod prompt;
pub mod schema;
pub mod selection;

use std::sync::Arc;

use crate::checklist::Document;
use crate::processor::{Cell, ContentExtractor};
use crate::storage::BlobStore;

pub use client::{BoundedExtractor, HttpExtractionClient, StructuredExtractor};
pub use error::ExtractionError;
pub use invoices::{
    InvoiceDetails, InvoiceEntry, InvoiceExtraction, InvoiceStatus, InvoiceSummary, Percentage,
};
pub use job_order::PoExtraction;
pub use media_plan::{MarketType, MediaPlanDetails, MediaPlanExtraction};
pub use schema::{FieldKind, FieldSchema, FieldSpec};
pub use selection::{
    select_candidate, CandidateClassifier, Classification, ModelClassifier, Selection,
    SelectionMethod,
};

/// Default cap on document characters embedded in one prompt.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 20_000;

/// Category-level extraction over the blob store and the extraction gateway.
#[derive(Clone)]
pub struct FieldExtractor {
    extractor: BoundedExtractor,
    blobs: Arc<dyn BlobStore>,
    content: Arc<dyn ContentExtractor>,
    classifier: Arc<dyn CandidateClassifier>,
    max_prompt_chars: usize,
}

impl FieldExtractor {
    /// Uses a [`ModelClassifier`] over the same collaborator for candidate
    /// selection.
    pub fn new(
        extractor: BoundedExtractor,
        blobs: Arc<dyn BlobStore>,
        content: Arc<dyn ContentExtractor>,
    ) -> Self {
        let classifier = Arc::new(ModelClassifier::new(extractor.clone()));
        Self {
            extractor,
            blobs,
            content,
            classifier,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn CandidateClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }

    async fn read_blob(&self, doc: &Document) -> Result<Vec<u8>, ExtractionError> {
        self.blobs
            .read(&doc.storage_ref)
            .await
            .map_err(|e| ExtractionError::Document {
                name: doc.display_name().to_string(),
                reason: e.to_string(),
            })
    }

    /// Reads a document's blob and extracts its text off the async runtime.
    async fn load_text(&self, doc: &Document) -> Result<String, ExtractionError> {
        let bytes = self.read_blob(doc).await?;
        let name = doc.display_name().to_string();
        let content = Arc::clone(&self.content);

        let task_name = name.clone();
        tokio::task::spawn_blocking(move || content.extract_text(&task_name, &bytes))
            .await
            .map_err(|e| ExtractionError::Document {
                name: name.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| ExtractionError::Document {
                name,
                reason: e.to_string(),
            })
    }

    async fn load_table(&self, doc: &Document) -> Result<Vec<Vec<Cell>>, ExtractionError> {
        let bytes = self.read_blob(doc).await?;
        let name = doc.display_name().to_string();
        let content = Arc::clone(&self.content);

        let task_name = name.clone();
        tokio::task::spawn_blocking(move || content.extract_table(&task_name, &bytes))
            .await
            .map_err(|e| ExtractionError::Document {
                name: name.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| ExtractionError::Document {
                name,
                reason: e.to_string(),
            })
    }
}
