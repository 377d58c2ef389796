pub mod pdf;
pub mod text;
pub mod xlsx;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Spreadsheet,
    LegacySpreadsheet,
    Image,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" | "csv" => Some(Self::Text),
            "xlsx" | "xlsm" => Some(Self::Spreadsheet),
            "xls" => Some(Self::LegacySpreadsheet),
            "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp" | "gif" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Detects the format from a filename, consulting the MIME table for
    /// extensions not listed above.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        if let Some(format) = Self::from_extension(extension) {
            return Some(format);
        }

        let mime = mime_guess::from_path(filename).first()?;
        match (mime.type_().as_str(), mime.subtype().as_str()) {
            ("application", "pdf") => Some(Self::Pdf),
            ("text", "plain") => Some(Self::Text),
            ("image", _) => Some(Self::Image),
            ("application", "vnd.ms-excel") => Some(Self::LegacySpreadsheet),
            ("application", sub) if sub.contains("spreadsheetml") => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, Self::Spreadsheet | Self::LegacySpreadsheet)
    }
}

/// One spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Turns raw document bytes into text or tabular content.
pub trait ContentExtractor: Send + Sync {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProcessError>;
    fn extract_table(&self, filename: &str, bytes: &[u8]) -> Result<Vec<Vec<Cell>>, ProcessError>;
}

/// Dispatches on the detected format to the PDF, text and XLSX readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentContentExtractor;

impl DocumentContentExtractor {
    pub fn new() -> Self {
        Self
    }

    fn detect(filename: &str) -> Result<DocumentFormat, ProcessError> {
        DocumentFormat::from_filename(filename)
            .ok_or_else(|| ProcessError::UnsupportedFormat(filename.to_string()))
    }
}

impl ContentExtractor for DocumentContentExtractor {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, ProcessError> {
        match Self::detect(filename)? {
            DocumentFormat::Pdf => pdf::extract_text(bytes),
            DocumentFormat::Text => text::extract_text(bytes),
            DocumentFormat::Spreadsheet => Ok(rows_to_text(&xlsx::extract_rows(bytes)?)),
            DocumentFormat::LegacySpreadsheet | DocumentFormat::Image => {
                Err(ProcessError::UnsupportedFormat(filename.to_string()))
            }
        }
    }

    fn extract_table(&self, filename: &str, bytes: &[u8]) -> Result<Vec<Vec<Cell>>, ProcessError> {
        match Self::detect(filename)? {
            DocumentFormat::Spreadsheet => xlsx::extract_rows(bytes),
            DocumentFormat::Text => text::extract_rows(bytes),
            _ => Err(ProcessError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Renders rows as tab-separated lines, dropping rows with no content.
pub fn rows_to_text(rows: &[Vec<Cell>]) -> String {
    let mut out = String::new();
    for row in rows {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let line: Vec<String> = row.iter().map(Cell::as_text).collect();
        out.push_str(line.join("\t").trim_end());
        out.push('\n');
    }
    out
}
