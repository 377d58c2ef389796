//! Agency invoice extraction: three invoices, one per payment tier.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use super::schema::{FieldKind, FieldSchema, FieldSpec};
use super::{prompt, ExtractionError, FieldExtractor};
use crate::checklist::Document;

/// Number of invoice texts required before any extraction is attempted.
pub const REQUIRED_INVOICES: usize = 3;

const FALLBACK_MESSAGE: &str = "Cannot extract invoice details with fewer than three readable invoices.";

const TIERS: &[&str] = &["20%", "30%", "50%"];

static RE_TIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])(20|30|50)\s?%").unwrap());

/// Payment milestone an invoice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Percentage {
    #[serde(rename = "20%")]
    Twenty,
    #[serde(rename = "30%")]
    Thirty,
    #[serde(rename = "50%")]
    Fifty,
}

impl Percentage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Percentage::Twenty => "20%",
            Percentage::Thirty => "30%",
            Percentage::Fifty => "50%",
        }
    }

    /// First tier token in a filename, e.g. `Invoice_30%_final.pdf`.
    pub fn from_filename(name: &str) -> Option<Self> {
        let caps = RE_TIER.captures(name)?;
        match caps.get(1)?.as_str() {
            "20" => Some(Percentage::Twenty),
            "30" => Some(Percentage::Thirty),
            "50" => Some(Percentage::Fifty),
            _ => None,
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub agency_invoice_number: String,
    pub project_code: String,
    pub campaign_name: String,
    pub total_amount: f64,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvoiceEntry {
    Extracted {
        file_name: String,
        #[serde(flatten)]
        details: InvoiceDetails,
    },
    Failed {
        file_name: String,
        error: String,
    },
}

impl InvoiceEntry {
    pub fn file_name(&self) -> &str {
        match self {
            InvoiceEntry::Extracted { file_name, .. } | InvoiceEntry::Failed { file_name, .. } => {
                file_name
            }
        }
    }

    pub fn details(&self) -> Option<&InvoiceDetails> {
        match self {
            InvoiceEntry::Extracted { details, .. } => Some(details),
            InvoiceEntry::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub total_amount: f64,
    /// `"{number} - {percentage}"` pairs joined by `", "`.
    pub agency_invoice_details: String,
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Success,
    /// Fewer than three readable invoices; nothing was extracted.
    Fallback,
    /// The extraction task itself died.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceExtraction {
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub invoices: Vec<InvoiceEntry>,
    #[serde(default)]
    pub summary: Option<InvoiceSummary>,
}

impl InvoiceExtraction {
    pub fn fallback() -> Self {
        Self {
            status: InvoiceStatus::Fallback,
            message: Some(FALLBACK_MESSAGE.to_string()),
            invoices: Vec::new(),
            summary: None,
        }
    }

    /// Category-level failure marker.
    pub fn task_failed(reason: impl Into<String>) -> Self {
        Self {
            status: InvoiceStatus::Error,
            message: Some(reason.into()),
            invoices: Vec::new(),
            summary: None,
        }
    }

    /// Summed invoice total, present only when at least one invoice was
    /// extracted.
    pub fn total_amount(&self) -> Option<f64> {
        let summary = self.summary.as_ref()?;
        if self.invoices.iter().any(|e| e.details().is_some()) {
            Some(summary.total_amount)
        } else {
            None
        }
    }

    pub fn first_campaign_name(&self) -> Option<&str> {
        self.invoices
            .first()
            .and_then(InvoiceEntry::details)
            .map(|d| d.campaign_name.as_str())
    }
}

pub fn schema() -> FieldSchema {
    FieldSchema::new(
        "agency_invoice",
        vec![
            FieldSpec::required("agency_invoice_number", FieldKind::String),
            FieldSpec::required("project_code", FieldKind::String)
                .describe("Project code, e.g. PR24|71-30%"),
            FieldSpec::required("campaign_name", FieldKind::String),
            FieldSpec::required("total_amount", FieldKind::Number),
            FieldSpec::required("percentage", FieldKind::Enum(TIERS))
                .describe("Must be one of: 20%, 30%, 50%"),
        ],
    )
}

impl FieldExtractor {
    /// Extracts the first three readable agency invoices.
    ///
    /// Fewer than three readable invoices short-circuits to a `fallback`
    /// result. A failure on one invoice is recorded as a `Failed` entry and
    /// does not stop the others.
    pub async fn extract_invoices(&self, docs: &[Document]) -> InvoiceExtraction {
        let span = tracing::info_span!("extract.invoices", documents = docs.len());
        async move {
            let mut loaded = Vec::with_capacity(docs.len());
            for doc in docs {
                match self.load_text(doc).await {
                    Ok(text) => loaded.push((doc, text)),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable invoice"),
                }
            }

            if loaded.len() < REQUIRED_INVOICES {
                tracing::info!(readable = loaded.len(), "Not enough invoices to extract");
                return InvoiceExtraction::fallback();
            }

            let mut invoices = Vec::with_capacity(REQUIRED_INVOICES);
            let mut summary = InvoiceSummary::default();
            let mut tags = Vec::new();

            for (doc, text) in loaded.into_iter().take(REQUIRED_INVOICES) {
                let file_name = doc.display_name().to_string();
                summary.file_names.push(file_name.clone());

                match self.extract_invoice(&file_name, &text).await {
                    Ok(details) => {
                        summary.total_amount += details.total_amount;
                        tags.push(format!(
                            "{} - {}",
                            details.agency_invoice_number, details.percentage
                        ));
                        invoices.push(InvoiceEntry::Extracted { file_name, details });
                    }
                    Err(e) => {
                        tracing::warn!(file = %file_name, error = %e, "Invoice extraction failed");
                        invoices.push(InvoiceEntry::Failed {
                            file_name,
                            error: e.to_string(),
                        });
                    }
                }
            }

            summary.agency_invoice_details = tags.join(", ");

            InvoiceExtraction {
                status: InvoiceStatus::Success,
                message: None,
                invoices,
                summary: Some(summary),
            }
        }
        .instrument(span)
        .await
    }

    async fn extract_invoice(
        &self,
        file_name: &str,
        text: &str,
    ) -> Result<InvoiceDetails, ExtractionError> {
        let prompt = prompt::invoice(file_name, text, self.max_prompt_chars);
        let tier = Percentage::from_filename(file_name);

        // Filename token outranks whatever the model read from the body.
        self.extractor
            .typed_with(&prompt, &schema(), |reply| {
                if let (Some(tier), Some(fields)) = (tier, reply.as_object_mut()) {
                    fields.insert("percentage".to_string(), Value::from(tier.as_str()));
                }
            })
            .await
    }
}
