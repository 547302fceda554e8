//! Error types for Lore.

use thiserror::Error;

/// Core error type for Lore domain operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using Lore's core Error.
pub type Result<T> = std::result::Result<T, Error>;
