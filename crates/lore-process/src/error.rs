//! Error types for media processing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for processing operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors that can occur while driving external media tools.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Tool not found: {tool}. Please install it.")]
    ToolNotFound { tool: String },

    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    #[error("OCR error: {0}")]
    OcrError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ProcessError {
    /// Keep tool diagnostics short enough for a report line.
    pub(crate) fn stderr_excerpt(stderr: &[u8]) -> String {
        let text = String::from_utf8_lossy(stderr);
        let trimmed = text.trim();
        match trimmed.char_indices().nth(500) {
            Some((idx, _)) => trimmed[..idx].to_string(),
            None => trimmed.to_string(),
        }
    }
}
