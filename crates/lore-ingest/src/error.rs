//! Error types for the ingestion pipeline.

use lore_config::ConfigError;
use lore_process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
///
/// Every per-file variant ends as a `Failed` outcome for that file only;
/// `Config`, `Setup` and `Report` abort the run. `TransientAnalysis` never
/// escapes the retry loop: exhausted retries degrade to a fallback result.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed for {file}: {message}")]
    Extraction { file: String, message: String },

    #[error("{stage} for {file}: {source}")]
    Process {
        file: String,
        stage: String,
        #[source]
        source: ProcessError,
    },

    #[error("analysis unavailable after {attempts} attempts: {reason}")]
    TransientAnalysis { attempts: u32, reason: String },

    #[error("Analysis rejected input: {0}")]
    AnalysisRejected(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report error: {0}")]
    Report(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Setup error: {0}")]
    Setup(String),
}

impl IngestError {
    pub(crate) fn extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Extraction {
            file: file.into(),
            message: message.into(),
        }
    }
}
