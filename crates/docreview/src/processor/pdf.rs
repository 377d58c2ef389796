use crate::error::ProcessError;

/// Pattern for Identity-H Unimplemented errors (common with CID fonts).
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Extracts embedded text from every page. Scanned PDFs without a text layer
/// are reported as an extraction failure so callers can skip them.
pub fn extract_text(bytes: &[u8]) -> Result<String, ProcessError> {
    let _span = tracing::debug_span!("processor.pdf", size = bytes.len()).entered();

    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => tracing::debug!(page = page_num, error = %e, "Skipping unreadable PDF page"),
        }
    }

    if !has_usable_text(&text) {
        return Err(ProcessError::TextExtraction(
            "PDF has no extractable text layer".to_string(),
        ));
    }

    Ok(text)
}

fn has_usable_text(text: &str) -> bool {
    let cleaned = text
        .trim()
        .replace(IDENTITY_H_PATTERN, "")
        .replace(['\n', ' '], "");
    !cleaned.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupted_pdf_error() {
        match extract_text(b"not a valid pdf content") {
            Err(ProcessError::PdfProcessing(msg)) => {
                assert!(msg.contains("Failed to load PDF"), "unexpected: {}", msg);
            }
            other => panic!("Expected PdfProcessing error, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_without_text_layer_rejected() {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();

        assert!(matches!(
            extract_text(&pdf_bytes),
            Err(ProcessError::TextExtraction(_))
        ));
    }

    #[test]
    fn test_has_usable_text() {
        assert!(!has_usable_text("  \n "));
        assert!(!has_usable_text("?Identity-H Unimplemented?\n?Identity-H Unimplemented?"));
        assert!(has_usable_text("Invoice No. 42"));
    }
}
