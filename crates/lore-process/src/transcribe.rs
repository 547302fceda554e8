//! Audio transcription using Whisper.

use crate::error::{ProcessError, ProcessResult};
use crate::require_tool;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// A segment of transcribed audio.
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// Full output of a transcription run.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// End time of the last segment.
    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct WhisperJsonOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
    start: f64,
    end: f64,
}

/// Transcribe an audio file using Whisper.
///
/// Requires the `whisper` CLI to be installed (pip install openai-whisper).
/// The JSON output is written into `output_dir`.
pub fn transcribe_audio(
    audio_path: &Path,
    model: &str,
    language: &str,
    output_dir: &Path,
) -> ProcessResult<Transcript> {
    if !audio_path.exists() {
        return Err(ProcessError::FileNotFound(audio_path.to_path_buf()));
    }
    require_tool("whisper")?;

    info!("Transcribing {:?} with model '{}'", audio_path, model);

    let output = Command::new("whisper")
        .arg(audio_path)
        .args(["--model", model])
        .args(["--language", language])
        .args(["--output_format", "json"])
        .arg("--output_dir")
        .arg(output_dir)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::TranscriptionError(
            ProcessError::stderr_excerpt(&output.stderr),
        ));
    }

    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let json_path = output_dir.join(format!("{}.json", stem));

    if !json_path.exists() {
        return Err(ProcessError::TranscriptionError(
            "Whisper output file not found".to_string(),
        ));
    }

    let json_content = std::fs::read_to_string(&json_path)?;
    let transcript = parse_whisper_json(&json_content, language)?;

    debug!("Transcribed {} segments", transcript.segments.len());
    Ok(transcript)
}

fn parse_whisper_json(json: &str, language: &str) -> ProcessResult<Transcript> {
    let parsed: WhisperJsonOutput = serde_json::from_str(json)
        .map_err(|e| ProcessError::ParseError(format!("Failed to parse Whisper output: {}", e)))?;

    let segments: Vec<TranscriptSegment> = parsed
        .segments
        .into_iter()
        .map(|s| TranscriptSegment {
            text: s.text.trim().to_string(),
            start: s.start,
            end: s.end,
        })
        .collect();

    let text = if parsed.text.trim().is_empty() {
        segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        parsed.text.trim().to_string()
    };

    Ok(Transcript {
        text,
        language: parsed.language.unwrap_or_else(|| language.to_string()),
        segments,
    })
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` past the first hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
