//! PDF extraction.

use super::display_name;
use crate::error::{IngestError, IngestResult};
use lore_core::{ExtractedContent, FileKind};
use std::path::Path;
use tracing::debug;

/// Extract the text layer of a PDF.
///
/// Page images are not extracted.
pub fn extract_pdf(path: &Path) -> IngestResult<ExtractedContent> {
    debug!("Parsing PDF: {:?}", path);

    let raw = pdf_extract::extract_text(path)
        .map_err(|e| IngestError::extraction(display_name(path), format!("PDF text extraction failed: {}", e)))?;

    let pages = raw.matches('\x0C').count().max(1);
    let text = clean_pdf_text(&raw);

    debug!("Extracted {} characters from PDF", text.len());

    let metadata = serde_json::json!({
        "format": "pdf",
        "length": text.len(),
        "pages": pages,
    });

    Ok(ExtractedContent::new(path, FileKind::Pdf, text).with_metadata(metadata))
}

/// Trim lines, collapse runs of blank lines and mark page breaks.
pub fn clean_pdf_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .fold(Vec::new(), |mut acc, line| {
            let last_was_empty = acc.last().map(|s: &String| s.is_empty()).unwrap_or(false);
            if !(line.is_empty() && last_was_empty) {
                acc.push(line.to_string());
            }
            acc
        })
        .join("\n")
        .replace('\x0C', "\n\n---\n\n")
        .trim()
        .to_string()
}
