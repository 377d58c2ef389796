use std::borrow::Cow;
use std::io::{Cursor, Read, Seek};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::error::ProcessError;
use crate::processor::Cell;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";

/// Zero-based index of column `XFD`, the last one a worksheet may use.
const MAX_COLUMN: usize = 16_383;

/// Reads the first worksheet of an XLSX workbook into rows of cells.
pub fn extract_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, ProcessError> {
    let _span = tracing::debug_span!("processor.xlsx", size = bytes.len()).entered();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ProcessError::SpreadsheetProcessing(format!("Failed to open XLSX: {}", e)))?;

    let shared = match read_entry(&mut archive, SHARED_STRINGS) {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(_) => Vec::new(),
    };

    let sheet_name = first_sheet_path(&mut archive).ok_or_else(|| {
        ProcessError::SpreadsheetProcessing("Workbook contains no worksheets".to_string())
    })?;
    let sheet_xml = read_entry(&mut archive, &sheet_name)?;

    parse_sheet(&sheet_xml, &shared)
}

/// The first tab in workbook order. Archives without a workbook manifest
/// fall back to `sheet1.xml`, then the lexically first worksheet part.
fn first_sheet_path<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Option<String> {
    if let Some(path) = first_sheet_from_workbook(archive) {
        return Some(path);
    }

    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .collect();
    if sheets.contains(&FIRST_SHEET) {
        return Some(FIRST_SHEET.to_string());
    }
    sheets.sort_unstable();
    sheets.first().map(|s| s.to_string())
}

fn first_sheet_from_workbook<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Option<String> {
    let workbook = read_entry(archive, WORKBOOK).ok()?;
    let rels = read_entry(archive, WORKBOOK_RELS).ok()?;

    let rel_id = first_sheet_relationship(&workbook)?;
    let target = relationship_target(&rels, &rel_id)?;
    let path = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };

    if archive.file_names().any(|n| n == path) {
        Some(path)
    } else {
        tracing::debug!(target = %path, "Workbook points at a missing worksheet");
        None
    }
}

fn attribute(e: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local_name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Relationship id (`r:id`) of the first `<sheet>` in `workbook.xml`.
fn first_sheet_relationship(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"sheet" =>
            {
                return attribute(e, b"id");
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn relationship_target(xml: &str, id: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship"
                    && attribute(e, b"Id").as_deref() == Some(id) =>
            {
                return attribute(e, b"Target");
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn read_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<String, ProcessError> {
    let mut entry = archive.by_name(name).map_err(|e| {
        ProcessError::SpreadsheetProcessing(format!("Failed to find {}: {}", name, e))
    })?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| {
        ProcessError::SpreadsheetProcessing(format!("Failed to read {}: {}", name, e))
    })?;
    Ok(xml)
}

/// Text of an entity or character reference. Unknown entities are kept
/// verbatim.
fn resolve_reference(e: &BytesRef<'_>) -> String {
    let name = e.decode().unwrap_or(Cow::Borrowed(""));

    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        if let Some(ch) = parsed.and_then(char::from_u32) {
            return ch.to_string();
        }
    } else if let Some(text) = resolve_predefined_entity(&name) {
        return text.to_string();
    }

    format!("&{};", name)
}

/// Each `<si>` is one shared string; rich text runs are concatenated.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_item = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(e)) if in_item && in_text => {
                current.push_str(&e.decode().unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) if in_item && in_text => {
                current.push_str(&resolve_reference(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProcessError::SpreadsheetProcessing(format!(
                    "Shared strings parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Inline,
    Formula,
    Boolean,
    Number,
}

struct PendingCell {
    column: Option<usize>,
    kind: CellKind,
    value: String,
}

impl PendingCell {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, ProcessError> {
        let mut column = None;
        let mut kind = CellKind::Number;

        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.as_ref() {
                b"r" => column = column_index(&value)?,
                b"t" => {
                    kind = match value.as_ref() {
                        "s" => CellKind::Shared,
                        "inlineStr" => CellKind::Inline,
                        "str" => CellKind::Formula,
                        "b" => CellKind::Boolean,
                        _ => CellKind::Number,
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            column,
            kind,
            value: String::new(),
        })
    }

    fn resolve(self, shared: &[String]) -> Cell {
        let raw = self.value.trim();
        if raw.is_empty() {
            return Cell::Empty;
        }

        match self.kind {
            CellKind::Shared => raw
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .map(|s| Cell::Text(s.clone()))
                .unwrap_or(Cell::Empty),
            CellKind::Inline | CellKind::Formula => Cell::Text(self.value),
            CellKind::Boolean => Cell::Text(if raw == "1" { "TRUE" } else { "FALSE" }.to_string()),
            CellKind::Number => raw
                .parse::<f64>()
                .map(Cell::Number)
                .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        }
    }
}

/// Zero-based column index from an A1 reference such as `AB12`. `None` when
/// the reference carries no column letters.
fn column_index(reference: &str) -> Result<Option<usize>, ProcessError> {
    let mut index = 0usize;
    let mut seen = false;

    for c in reference.chars().take_while(char::is_ascii_alphabetic) {
        seen = true;
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|i| *i <= MAX_COLUMN + 1)
            .ok_or_else(|| {
                ProcessError::SpreadsheetProcessing(format!(
                    "Cell reference '{}' is beyond column XFD",
                    reference
                ))
            })?;
    }

    Ok(seen.then(|| index - 1))
}

fn place(row: &mut Vec<Cell>, cell: PendingCell, shared: &[String]) {
    let column = cell.column.unwrap_or(row.len());
    let value = cell.resolve(shared);
    if row.len() <= column {
        row.resize(column + 1, Cell::Empty);
    }
    row[column] = value;
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<Cell>>, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut rows = Vec::new();
    let mut row: Option<Vec<Cell>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => cell = Some(PendingCell::from_start(e)?),
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let empty = PendingCell::from_start(e)?;
                    if let Some(ref mut r) = row {
                        place(r, empty, shared);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                b"c" => {
                    if let (Some(r), Some(c)) = (row.as_mut(), cell.take()) {
                        place(r, c, shared);
                    }
                }
                b"v" | b"t" => capture = false,
                _ => {}
            },
            Ok(Event::Text(e)) if capture => {
                if let Some(ref mut c) = cell {
                    c.value.push_str(&e.decode().unwrap_or_default());
                }
            }
            Ok(Event::GeneralRef(e)) if capture => {
                if let Some(ref mut c) = cell {
                    c.value.push_str(&resolve_reference(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProcessError::SpreadsheetProcessing(format!(
                    "Worksheet parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rows)
}
