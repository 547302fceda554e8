//! DOCX extraction.

use super::display_name;
use crate::error::{IngestError, IngestResult};
use lore_core::{ExtractedContent, ExtractedImage, FileKind};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("paragraph pattern"));
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:pStyle w:val="([^"]+)""#).expect("style pattern"));
static RUN_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br/>").expect("run pattern")
});
static HEADING_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^heading\s?(\d)$").expect("heading style pattern"));

/// Extract paragraphs and embedded images from a Word document.
///
/// Paragraphs styled as headings become Markdown headings. Images under
/// `word/media/` are written to `scratch_dir`.
pub fn extract_docx(path: &Path, scratch_dir: &Path) -> IngestResult<ExtractedContent> {
    let name = display_name(path);
    let zip_err = |e: zip::result::ZipError| IngestError::extraction(&name, format!("invalid DOCX: {}", e));

    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(zip_err)?
        .read_to_string(&mut xml)?;

    let (text, title) = document_text(&xml);
    let images = extract_media(&mut archive, scratch_dir).map_err(|e| {
        IngestError::extraction(&name, format!("failed to extract embedded images: {}", e))
    })?;

    debug!("DOCX {}: {} chars, {} images", name, text.len(), images.len());

    let metadata = serde_json::json!({
        "format": "docx",
        "length": text.len(),
        "images": images.len(),
    });

    let mut content = ExtractedContent::new(path, FileKind::Docx, text)
        .with_images(images)
        .with_metadata(metadata);
    if let Some(title) = title {
        content = content.with_title_hint(title);
    }
    Ok(content)
}

/// Convert `word/document.xml` into Markdown-ish text.
fn document_text(xml: &str) -> (String, Option<String>) {
    let mut blocks = Vec::new();
    let mut title = None;

    for paragraph in PARAGRAPH.find_iter(xml) {
        let paragraph = paragraph.as_str();

        let mut line = String::new();
        for part in RUN_PART.captures_iter(paragraph) {
            match part.get(1) {
                Some(text) => line.push_str(&unescape_xml(text.as_str())),
                None if part[0].starts_with("<w:tab") => line.push('\t'),
                None => line.push('\n'),
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let level = STYLE
            .captures(paragraph)
            .and_then(|c| heading_level(&c[1]));

        match level {
            Some(level) => {
                if title.is_none() && level == 1 {
                    title = Some(line.to_string());
                }
                blocks.push(format!("{} {}", "#".repeat(level), line));
            }
            None => blocks.push(line.to_string()),
        }
    }

    (blocks.join("\n\n"), title)
}

fn heading_level(style: &str) -> Option<usize> {
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    HEADING_STYLE
        .captures(style)
        .and_then(|c| c[1].parse::<usize>().ok())
        .map(|n| n.clamp(1, 6))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_media(
    archive: &mut zip::ZipArchive<File>,
    scratch_dir: &Path,
) -> io::Result<Vec<ExtractedImage>> {
    let mut images = Vec::new();

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable DOCX entry {}: {}", i, e);
                continue;
            }
        };
        let Some(file_name) = entry
            .name()
            .strip_prefix("word/media/")
            .filter(|n| !n.is_empty() && !n.contains('/'))
            .map(str::to_string)
        else {
            continue;
        };

        fs::create_dir_all(scratch_dir)?;
        let dest = scratch_dir.join(&file_name);
        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out)?;

        images.push(ExtractedImage::new(dest));
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Objection Handling</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Listen first, </w:t></w:r><w:r><w:t>then answer &amp; confirm.</w:t></w:r></w:p>
<w:p></w:p>
<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Price</w:t></w:r></w:p>
</w:body></w:document>"#;

    fn write_docx(path: &Path, with_image: bool) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(DOCUMENT.as_bytes()).unwrap();
        if with_image {
            zip.start_file("word/media/image1.png", options).unwrap();
            zip.write_all(b"\x89PNG fake").unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_paragraphs_and_headings() {
        let (text, title) = document_text(DOCUMENT);
        assert_eq!(title.as_deref(), Some("Objection Handling"));
        assert_eq!(
            text,
            "# Objection Handling\n\nListen first, then answer & confirm.\n\n## Price"
        );
    }

    #[test]
    fn test_extract_docx_with_media() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guide.docx");
        write_docx(&path, true);
        let scratch = dir.path().join("tmp_images/guide");

        let content = extract_docx(&path, &scratch).unwrap();

        assert_eq!(content.kind, FileKind::Docx);
        assert_eq!(content.title_hint.as_deref(), Some("Objection Handling"));
        assert_eq!(content.images.len(), 1);
        assert!(scratch.join("image1.png").exists());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        fs::write(&path, "plain text").unwrap();

        let err = extract_docx(&path, dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
