//! Shared fakes for docreview integration tests.
//!
//! `ScriptedGateway` stands in for the extraction gateway and answers by
//! schema name, reading `KEY=value` markers out of the prompt so each test
//! controls the figures through document content.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use docreview::extraction::{BoundedExtractor, ExtractionError, FieldSchema, StructuredExtractor};
use docreview::processor::DocumentContentExtractor;
use docreview::storage::BlobStore;
use docreview::FieldExtractor;

#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<HashMap<&'static str, usize>>,
    /// Index returned for media plan disambiguation.
    pub selected_index: i64,
    /// Schema name whose request panics.
    pub panic_on: Option<&'static str>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selecting(index: i64) -> Self {
        Self {
            selected_index: index,
            ..Self::default()
        }
    }

    pub fn panicking_on(schema: &'static str) -> Self {
        Self {
            panic_on: Some(schema),
            ..Self::default()
        }
    }

    pub fn calls(&self, schema: &str) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.get(schema).copied().unwrap_or(0)
    }
}

/// Value following `KEY=` in the prompt, up to whitespace or a tab.
fn marker<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{}=", key);
    prompt
        .split(needle.as_str())
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
}

fn number(prompt: &str, key: &str) -> Value {
    marker(prompt, key)
        .and_then(|v| v.parse::<f64>().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

#[async_trait]
impl StructuredExtractor for ScriptedGateway {
    async fn request(&self, prompt: &str, schema: &FieldSchema) -> Result<Value, ExtractionError> {
        *self.calls.lock().unwrap().entry(schema.name).or_insert(0) += 1;

        if self.panic_on == Some(schema.name) {
            panic!("scripted gateway panic for {}", schema.name);
        }

        match schema.name {
            "agency_invoice" => Ok(json!({
                "agency_invoice_number": marker(prompt, "INV").unwrap_or("UNKNOWN"),
                "project_code": "PR24|71",
                "campaign_name": "Spring Launch",
                "total_amount": number(prompt, "AMOUNT"),
            })),
            "job_order" => Ok(json!({
                "po_number": marker(prompt, "PO").unwrap_or("UNKNOWN"),
                "po_amount": number(prompt, "PO_AMOUNT"),
            })),
            "media_plan" => {
                let sum: f64 = ["NET", "FEE", "TAX"]
                    .iter()
                    .filter_map(|k| number(prompt, k).as_f64())
                    .sum();
                Ok(json!({
                    "medium": "Digital, TV",
                    "net_media_cost": number(prompt, "NET"),
                    "agency_fees": number(prompt, "FEE"),
                    "taxes_amount": number(prompt, "TAX"),
                    "media_plan_total_amount": sum,
                    "market_type": "MEA",
                    "period_month": "Sep 2024",
                }))
            }
            "media_plan_selection" => Ok(json!({
                "selected_index": self.selected_index,
                "reason": "scripted",
            })),
            other => Err(ExtractionError::Malformed(format!(
                "unexpected schema {}",
                other
            ))),
        }
    }
}

pub fn field_extractor(gateway: Arc<ScriptedGateway>, blobs: Arc<dyn BlobStore>) -> FieldExtractor {
    let bounded = BoundedExtractor::new(gateway, Duration::from_secs(5));
    FieldExtractor::new(bounded, blobs, Arc::new(DocumentContentExtractor::new()))
}

/// Minimal single-sheet workbook with inline string cells.
pub fn workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let column = (b'A' + c as u8) as char;
            sheet_rows.push_str(&format!(
                r#"<c r="{col}{row}" t="inlineStr"><is><t>{value}</t></is></c>"#,
                col = column,
                row = r + 1,
                value = value
            ));
        }
        sheet_rows.push_str("</row>");
    }
    let sheet = format!(
        r#"<worksheet><sheetData>{}</sheetData></worksheet>"#,
        sheet_rows
    );

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file(
                "xl/worksheets/sheet1.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(sheet.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

/// Media plan sheet whose figures the gateway reads back via markers.
pub fn media_plan_workbook(net: f64, fee: f64, tax: f64) -> Vec<u8> {
    let net = format!("NET={}", net);
    let fee = format!("FEE={}", fee);
    let tax = format!("TAX={}", tax);
    workbook(&[
        &["Medium", "Geo Targeting", "Figures"],
        &["Digital", "UAE", net.as_str()],
        &["TV", "UAE", fee.as_str()],
        &["Total", "", tax.as_str()],
    ])
}
