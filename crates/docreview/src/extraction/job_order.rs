use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::schema::{FieldKind, FieldSchema, FieldSpec};
use super::{prompt, ExtractionError, FieldExtractor};
use crate::checklist::Document;

/// PO number and amount from the job order. Empty when no job order was
/// uploaded; `error` is set when one existed but could not be extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoExtraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PoExtraction {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.po_number.is_none() && self.po_amount.is_none() && self.error.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct PoDetails {
    po_number: String,
    po_amount: f64,
}

pub fn schema() -> FieldSchema {
    FieldSchema::new(
        "job_order",
        vec![
            FieldSpec::required("po_number", FieldKind::String).describe(
                "The Purchase Order (PO) number, sometimes referred to as Job Order number.",
            ),
            FieldSpec::required("po_amount", FieldKind::Number)
                .describe("The total amount of the Purchase Order."),
        ],
    )
}

impl FieldExtractor {
    /// Extracts PO details from the first readable job order.
    pub async fn extract_job_order(&self, docs: &[Document]) -> PoExtraction {
        if docs.is_empty() {
            return PoExtraction::default();
        }

        let span = tracing::info_span!("extract.job_order", documents = docs.len());
        async move {
            let mut source = None;
            for doc in docs {
                match self.load_text(doc).await {
                    Ok(text) => {
                        source = Some((doc, text));
                        break;
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable job order"),
                }
            }

            let Some((doc, text)) = source else {
                return PoExtraction::failed("No readable job order document");
            };

            let file_name = doc.display_name();
            match self.extract_po(file_name, &text).await {
                Ok(details) => PoExtraction {
                    po_number: Some(details.po_number),
                    po_amount: Some(details.po_amount),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "Job order extraction failed");
                    PoExtraction::failed(format!("Extraction failed for {}: {}", file_name, e))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn extract_po(&self, file_name: &str, text: &str) -> Result<PoDetails, ExtractionError> {
        let prompt = prompt::job_order(file_name, text, self.max_prompt_chars);
        self.extractor.typed(&prompt, &schema()).await
    }
}
