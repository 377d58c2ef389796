use crate::error::ProcessError;
use crate::processor::Cell;

pub fn extract_text(bytes: &[u8]) -> Result<String, ProcessError> {
    std::str::from_utf8(bytes)
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .map_err(|e| ProcessError::TextExtraction(format!("Text is not valid UTF-8: {}", e)))
}

/// Splits delimited text into rows. Tabs take precedence over commas.
pub fn extract_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, ProcessError> {
    let text = extract_text(bytes)?;
    let delimiter = if text.contains('\t') { '\t' } else { ',' };

    Ok(text
        .lines()
        .map(|line| line.split(delimiter).map(parse_cell).collect())
        .collect())
}

fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Cell::Empty
    } else if let Ok(n) = trimmed.parse::<f64>() {
        Cell::Number(n)
    } else {
        Cell::Text(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_strips_bom() {
        let text = extract_text("\u{feff}Hello, World!".as_bytes()).unwrap();
        assert_eq!(text, "Hello, World!");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x00]),
            Err(ProcessError::TextExtraction(_))
        ));
    }

    #[test]
    fn test_extract_rows_typed_cells() {
        let rows = extract_rows(b"Medium\tNet\nTV\t500\nRadio\t\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![Cell::Text("TV".into()), Cell::Number(500.0)]);
        assert_eq!(rows[2], vec![Cell::Text("Radio".into()), Cell::Empty]);
    }
}
