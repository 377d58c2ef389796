//! Media plan extraction from the approved quotation spreadsheets.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::schema::{FieldKind, FieldSchema, FieldSpec};
use super::selection::{select_candidate, Selection};
use super::{prompt, ExtractionError, FieldExtractor};
use crate::checklist::Document;
use crate::processor::{rows_to_text, Cell};

const MARKET_TYPES: &[&str] = &["A/E", "APAC", "DOMESTIC", "COE", "MEA"];

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];

static RE_DOMESTIC_GEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(saudi\s+arabia|ksa)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketType {
    #[serde(rename = "A/E")]
    AE,
    #[serde(rename = "APAC")]
    Apac,
    #[serde(rename = "DOMESTIC")]
    Domestic,
    #[serde(rename = "COE")]
    Coe,
    #[serde(rename = "MEA")]
    Mea,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::AE => "A/E",
            MarketType::Apac => "APAC",
            MarketType::Domestic => "DOMESTIC",
            MarketType::Coe => "COE",
            MarketType::Mea => "MEA",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPlanDetails {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub net_media_cost: Option<f64>,
    #[serde(default)]
    pub agency_fees: Option<f64>,
    #[serde(default)]
    pub taxes_amount: Option<f64>,
    #[serde(default)]
    pub third_party_cost: Option<f64>,
    #[serde(default)]
    pub media_plan_total_amount: Option<f64>,
    #[serde(default)]
    pub market_type: Option<MarketType>,
    #[serde(default)]
    pub period_month: Option<String>,
}

/// Result of media plan extraction. All fields are absent when the
/// quotations contained no media plan spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPlanExtraction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<MediaPlanDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MediaPlanExtraction {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}

pub fn schema() -> FieldSchema {
    FieldSchema::new(
        "media_plan",
        vec![
            FieldSpec::required("medium", FieldKind::String)
                .describe("Type of media (comma-separated if multiple)."),
            FieldSpec::required("net_media_cost", FieldKind::Number)
                .describe("Sum of net media costs."),
            FieldSpec::required("agency_fees", FieldKind::Number).describe("Sum of agency fees."),
            FieldSpec::required("taxes_amount", FieldKind::Number)
                .describe("Total taxes amount (Vat Ksa)."),
            FieldSpec::optional("third_party_cost", FieldKind::Number)
                .describe("Third party cost, 0 if not available."),
            FieldSpec::required("media_plan_total_amount", FieldKind::Number)
                .describe("Total media plan amount including agency fees."),
            FieldSpec::required("market_type", FieldKind::Enum(MARKET_TYPES))
                .describe("Classified market type (BU/Markets from Geo-targeting)."),
            FieldSpec::optional("period_month", FieldKind::String)
                .describe("The billing period/month, usually at the top of the sheet."),
        ],
    )
}

/// Spreadsheet whose name mentions "media plan", treating `_` and `-` as
/// spaces.
pub fn is_media_plan_candidate(file_name: &str) -> bool {
    let is_spreadsheet = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if !is_spreadsheet {
        return false;
    }

    let normalized: String = file_name
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    normalized.contains("media plan")
}

/// True when a geo-targeting column mentions Saudi Arabia or KSA.
///
/// A column is a geo column from the row where a header cell containing
/// "geo" appears.
pub fn mentions_domestic_geo(rows: &[Vec<Cell>]) -> bool {
    let mut geo_columns: Vec<usize> = Vec::new();

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let text = cell.as_text();
            if geo_columns.contains(&i) && RE_DOMESTIC_GEO.is_match(&text) {
                return true;
            }
            if text.to_lowercase().contains("geo") && !geo_columns.contains(&i) {
                geo_columns.push(i);
            }
        }
    }

    false
}

impl FieldExtractor {
    /// Picks the actualized media plan among the quotation spreadsheets and
    /// extracts its figures.
    pub async fn extract_media_plan(&self, docs: &[Document]) -> MediaPlanExtraction {
        let candidates: Vec<&Document> = docs
            .iter()
            .filter(|d| is_media_plan_candidate(d.display_name()))
            .collect();
        if candidates.is_empty() {
            tracing::debug!("No media plan spreadsheet among quotations");
            return MediaPlanExtraction::default();
        }

        let span = tracing::info_span!("extract.media_plan", candidates = candidates.len());
        async move {
            let names: Vec<String> = candidates
                .iter()
                .map(|d| d.display_name().to_string())
                .collect();

            let Some(selection) = select_candidate(self.classifier.as_ref(), &names).await else {
                return MediaPlanExtraction::default();
            };
            let doc = candidates[selection.index];
            let file_name = names[selection.index].clone();
            tracing::debug!(file = %file_name, method = ?selection.method, "Media plan selected");

            let mut result = MediaPlanExtraction {
                candidates: names,
                selected_file: Some(file_name.clone()),
                selection: Some(selection),
                details: None,
                error: None,
            };

            match self.extract_selected(doc, &file_name).await {
                Ok(details) => result.details = Some(details),
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "Media plan extraction failed");
                    result.error = Some(e.to_string());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn extract_selected(
        &self,
        doc: &Document,
        file_name: &str,
    ) -> Result<MediaPlanDetails, ExtractionError> {
        let rows = self.load_table(doc).await?;
        let prompt = prompt::media_plan(file_name, &rows_to_text(&rows), self.max_prompt_chars);
        let mut details: MediaPlanDetails = self.extractor.typed(&prompt, &schema()).await?;

        if details.third_party_cost.is_none() {
            details.third_party_cost = Some(0.0);
        }
        if mentions_domestic_geo(&rows) {
            details.market_type = Some(MarketType::Domestic);
        }

        Ok(details)
    }
}
