//! OCR processing using Tesseract.

use crate::error::{ProcessError, ProcessResult};
use crate::require_tool;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Perform OCR on an image file and return the recognized text.
pub fn ocr_image(image_path: &Path) -> ProcessResult<String> {
    if !image_path.exists() {
        return Err(ProcessError::FileNotFound(image_path.to_path_buf()));
    }
    require_tool("tesseract")?;

    debug!("Running OCR on {:?}", image_path);

    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .args(["--oem", "3"])
        .args(["--psm", "1"])
        .output()?;

    if !output.status.success() {
        // Tesseract reports warnings on stderr while still producing text
        if output.stdout.is_empty() {
            return Err(ProcessError::OcrError(ProcessError::stderr_excerpt(
                &output.stderr,
            )));
        }
        debug!(
            "Tesseract warning: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(collapse_blank_lines(&String::from_utf8_lossy(&output.stdout)))
}

/// Trim lines and drop runs of empty lines left by page segmentation.
fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
