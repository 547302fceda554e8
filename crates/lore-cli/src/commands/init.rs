//! Initialize a Lore project.

use super::Project;
use anyhow::{Context, Result};
use colored::Colorize;
use lore_config::Config;

pub fn run(project: &Project) -> Result<()> {
    let layout = &project.layout;
    let config_file = Config::project_file(&layout.root);

    if layout.is_initialized() && config_file.exists() {
        println!("{} Lore is already initialized.", "Note:".yellow().bold());
        println!("  Root: {}", layout.root.display());
        println!("  Config: {}", config_file.display());
        return Ok(());
    }

    println!("{}", "Initializing Lore...".cyan().bold());

    layout.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories under {}", "✓".green(), layout.root.display());

    if !config_file.exists() {
        Config::create_default_file(&config_file).context("Failed to create config file")?;
        println!("  {} Created config: {}", "✓".green(), config_file.display());
    }

    println!();
    println!("{}", "Lore initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Drop files into: {}", layout.raw_dir.display().to_string().cyan());
    println!("  2. Check tools: {}", "lore status".cyan());
    println!("  3. Process them: {}", "lore run".cyan());

    Ok(())
}
