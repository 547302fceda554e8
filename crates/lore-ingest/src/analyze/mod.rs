//! Content analysis: classification, structuring and verification.

mod json;
mod labels;
mod ollama;
mod prompts;
mod retry;

pub use json::extract_json;
pub use labels::{fuzzy_match, normalize_terminology, validate_labels};
pub use ollama::{AnalyzerSettings, LanguageModel, OllamaAnalyzer};
pub use retry::{analyze_with_retry, RetryPolicy};

use async_trait::async_trait;
use lore_core::{AnalysisResult, ExtractedContent};
use thiserror::Error;

/// Failure reported by an analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Worth retrying: network trouble, timeouts, malformed model output.
    #[error("{0}")]
    Transient(String),

    /// The input itself was rejected; retrying cannot help.
    #[error("{0}")]
    Permanent(String),
}

impl AnalyzeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalyzeError::Transient(_))
    }
}

/// Labels and structures extracted content.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, content: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError>;
}
