//! CLI command implementations.

pub mod config;
pub mod init;
pub mod report;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use lore_config::{Config, ProjectLayout};
use std::path::{Path, PathBuf};

/// Project root and config file selected on the command line.
pub struct Project {
    pub layout: ProjectLayout,
    pub config_file: Option<PathBuf>,
}

impl Project {
    pub fn new(root: &str, config_file: Option<PathBuf>) -> Self {
        Self {
            layout: ProjectLayout::new(expand_path(root)),
            config_file: config_file.map(|p| expand_path(&p.to_string_lossy())),
        }
    }

    /// Load the effective configuration for this project.
    pub fn config(&self) -> Result<Config> {
        let config = Config::resolve(&self.layout.root, self.config_file.as_deref())
            .context("Failed to load config")?;
        if !config.ui.color {
            colored::control::set_override(false);
        }
        Ok(config)
    }

    /// Fail unless `lore init` has been run for this root.
    pub fn require_initialized(&self) -> Result<()> {
        if !self.layout.is_initialized() {
            anyhow::bail!(
                "No Lore project at {}. Run 'lore init' first.",
                self.layout.root.display()
            );
        }
        Ok(())
    }
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}

/// Number of regular files directly inside `dir`.
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
