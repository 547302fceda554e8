//! Lore Config - Configuration and project layout for Lore.

mod config;
mod error;
mod paths;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use paths::{AppPaths, ProjectLayout};
