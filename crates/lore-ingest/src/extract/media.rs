//! Audio, video and image extraction through external tools.

use super::display_name;
use crate::error::{IngestError, IngestResult};
use lore_core::{ExtractedContent, ExtractedImage, FileKind};
use lore_process::{
    extract_audio, format_timestamp, get_video_info, ocr_image, transcribe_audio, ProcessError,
    Transcript,
};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

fn tool_error(path: &Path, stage: &str, err: ProcessError) -> IngestError {
    IngestError::Process {
        file: display_name(path),
        stage: stage.to_string(),
        source: err,
    }
}

fn transcript_metadata(transcript: &Transcript, format: &str, whisper_model: &str) -> serde_json::Value {
    serde_json::json!({
        "format": format,
        "language": transcript.language,
        "duration": transcript.duration_seconds(),
        "duration_display": format_timestamp(transcript.duration_seconds()),
        "segment_count": transcript.segments.len(),
        "whisper_model": whisper_model,
    })
}

/// Transcribe an audio file with Whisper.
pub(super) fn extract_audio_file(
    path: &Path,
    whisper_model: &str,
    language: &str,
    scratch_dir: &Path,
) -> IngestResult<ExtractedContent> {
    fs::create_dir_all(scratch_dir)?;

    info!("Transcribing {} with Whisper ({})", display_name(path), whisper_model);
    let transcript = transcribe_audio(path, whisper_model, language, scratch_dir)
        .map_err(|e| tool_error(path, "transcription failed", e))?;

    info!("Transcribed {} segments", transcript.segments.len());

    let metadata = transcript_metadata(&transcript, "audio", whisper_model);
    Ok(ExtractedContent::new(path, FileKind::Audio, transcript.text).with_metadata(metadata))
}

/// Extract the audio track of a video, then transcribe it.
pub(super) fn extract_video_file(
    path: &Path,
    whisper_model: &str,
    language: &str,
    scratch_dir: &Path,
) -> IngestResult<ExtractedContent> {
    fs::create_dir_all(scratch_dir)?;

    let video_info = match get_video_info(path) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("Could not probe {}: {}", display_name(path), e);
            None
        }
    };

    info!("Extracting audio from {}", display_name(path));
    let audio_path =
        extract_audio(path, scratch_dir).map_err(|e| tool_error(path, "audio extraction failed", e))?;

    let transcript = transcribe_audio(&audio_path, whisper_model, language, scratch_dir)
        .map_err(|e| tool_error(path, "transcription failed", e))?;

    let _ = fs::remove_file(&audio_path);

    let mut metadata = transcript_metadata(&transcript, "video", whisper_model);
    if let Some(video) = video_info {
        metadata["width"] = serde_json::json!(video.width);
        metadata["height"] = serde_json::json!(video.height);
        metadata["video_codec"] = serde_json::json!(video.video_codec);
        metadata["audio_codec"] = serde_json::json!(video.audio_codec);
    }

    Ok(ExtractedContent::new(path, FileKind::Video, transcript.text).with_metadata(metadata))
}

/// OCR an image (when enabled) and attach the image itself for description.
pub(super) fn extract_image_file(path: &Path, ocr_enabled: bool) -> IngestResult<ExtractedContent> {
    let text = if ocr_enabled {
        match ocr_image(path) {
            Ok(text) => text,
            Err(ProcessError::ToolNotFound { tool }) => {
                warn!("{} not installed, skipping OCR for {}", tool, display_name(path));
                String::new()
            }
            Err(e) => return Err(tool_error(path, "OCR failed", e)),
        }
    } else {
        String::new()
    };

    let metadata = serde_json::json!({
        "format": "image",
        "ocr": ocr_enabled,
        "ocr_length": text.len(),
    });

    Ok(ExtractedContent::new(path, FileKind::Image, text)
        .with_images(vec![ExtractedImage::new(path)])
        .with_metadata(metadata))
}
