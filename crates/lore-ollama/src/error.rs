//! Error types for Ollama operations.

use thiserror::Error;

/// Errors that can occur when interacting with Ollama.
#[derive(Error, Debug)]
pub enum OllamaError {
    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}. Run 'ollama pull {model}' to download it.")]
    ModelNotFound { model: String },

    /// Ollama server is not running.
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OllamaError {
    /// Whether retrying the same request may succeed.
    ///
    /// Connection problems, timeouts, rate limiting and server-side errors
    /// are transient; a missing model or a client error is not.
    pub fn is_transient(&self) -> bool {
        match self {
            OllamaError::Timeout { .. } | OllamaError::ServerNotRunning { .. } => true,
            OllamaError::ApiError { status, .. } => *status == 429 || *status >= 500,
            OllamaError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            OllamaError::ParseError(_) | OllamaError::Json(_) => true,
            OllamaError::ModelNotFound { .. } => false,
        }
    }
}

/// Result type for Ollama operations.
pub type OllamaResult<T> = Result<T, OllamaError>;
