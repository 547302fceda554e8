//! Markdown extraction.

use crate::error::IngestResult;
use lore_core::{ExtractedContent, FileKind};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use std::path::Path;

/// Strip Markdown markup, keeping headings, list markers and code blocks.
///
/// Returns the text, the first H1 (if any) and the link targets.
pub(crate) fn strip_markdown(markdown: &str) -> (String, Option<String>, Vec<String>) {
    let mut text = String::new();
    let mut title: Option<String> = None;
    let mut links = Vec::new();
    let mut in_heading = false;
    let mut heading_level: Option<HeadingLevel> = None;
    let mut current_heading = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading(level, _, _)) => {
                in_heading = true;
                heading_level = Some(level);
                current_heading.clear();
            }
            Event::End(Tag::Heading(_, _, _)) => {
                in_heading = false;
                if heading_level == Some(HeadingLevel::H1) && title.is_none() {
                    title = Some(current_heading.trim().to_string());
                }
                text.push_str(&current_heading);
                text.push_str("\n\n");
                heading_level = None;
            }
            Event::Start(Tag::CodeBlock(_)) => text.push_str("\n```\n"),
            Event::End(Tag::CodeBlock(_)) => text.push_str("```\n\n"),
            Event::Start(Tag::Link(_, dest, _)) => links.push(dest.to_string()),
            Event::End(Tag::Paragraph) => text.push_str("\n\n"),
            Event::End(Tag::List(_)) => text.push('\n'),
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(Tag::Item) => text.push('\n'),
            Event::Text(t) => {
                if in_heading {
                    current_heading.push_str(&t);
                } else {
                    text.push_str(&t);
                }
            }
            Event::Code(code) => {
                text.push('`');
                text.push_str(&code);
                text.push('`');
            }
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            _ => {}
        }
    }

    (text.trim().to_string(), title, links)
}

/// Extract a Markdown file.
pub fn extract_markdown(path: &Path) -> IngestResult<ExtractedContent> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    let (text, title, links) = strip_markdown(&source);

    let metadata = serde_json::json!({
        "format": "markdown",
        "links": links,
        "original_length": source.len(),
    });

    let mut content = ExtractedContent::new(path, FileKind::Text, text).with_metadata(metadata);
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        content = content.with_title_hint(title);
    }
    Ok(content)
}
