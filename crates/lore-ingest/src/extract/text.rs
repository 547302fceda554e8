//! Plain text and CSV extraction.

use super::extract_markdown;
use crate::error::IngestResult;
use lore_core::{ExtractedContent, FileKind};
use std::path::Path;

/// Read a text file, replacing invalid UTF-8 sequences.
///
/// Markdown files are routed through the Markdown extractor so that markup is
/// stripped and the first heading becomes the title hint.
pub fn extract_text(path: &Path) -> IngestResult<ExtractedContent> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if extension == "md" {
        return extract_markdown(path);
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let metadata = serde_json::json!({
        "format": if extension == "csv" { "csv" } else { "text" },
        "length": content.len(),
        "lines": content.lines().count(),
    });

    Ok(ExtractedContent::new(path, FileKind::Text, content).with_metadata(metadata))
}
