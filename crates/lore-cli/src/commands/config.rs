//! Configuration commands.

use super::Project;
use anyhow::{Context, Result};
use colored::Colorize;
use lore_config::Config;

pub fn show(project: &Project) -> Result<()> {
    let config = project.config()?;
    let source = match &project.config_file {
        Some(path) => path.display().to_string(),
        None => {
            let project_file = Config::project_file(&project.layout.root);
            if project_file.exists() {
                project_file.display().to_string()
            } else {
                "user config or built-in defaults".to_string()
            }
        }
    };

    let contents = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{} {}", "Source:".dimmed(), source);
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}
