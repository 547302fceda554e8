//! Lore Process - External media tooling.
//!
//! This crate provides:
//! - Audio extraction from video (via FFmpeg CLI)
//! - Audio transcription (via Whisper CLI)
//! - OCR for images (via Tesseract CLI)
//!
//! These rely on external tools being installed on the system.

mod error;
mod ffmpeg;
mod ocr;
mod transcribe;

pub use error::{ProcessError, ProcessResult};
pub use ffmpeg::{extract_audio, get_video_info, VideoInfo};
pub use ocr::ocr_image;
pub use transcribe::{format_timestamp, transcribe_audio, Transcript, TranscriptSegment};

const TOOLS: [&str; 4] = ["ffmpeg", "ffprobe", "whisper", "tesseract"];

/// Check which external tools are available.
pub fn check_dependencies() -> Vec<(&'static str, bool)> {
    TOOLS
        .iter()
        .map(|tool| (*tool, which::which(tool).is_ok()))
        .collect()
}

pub(crate) fn require_tool(tool: &str) -> ProcessResult<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| ProcessError::ToolNotFound {
            tool: tool.to_string(),
        })
}
