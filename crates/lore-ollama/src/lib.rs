//! Lore Ollama - Ollama integration for text and vision generation.
//!
//! This crate provides an async client for Ollama's generate API, used by
//! the intake pipeline for classification, structuring and image description.

mod client;
mod error;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use types::*;
