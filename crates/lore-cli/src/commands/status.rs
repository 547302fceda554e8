//! Status command - show intake counts and tool availability.

use super::{count_files, Project};
use anyhow::{Context, Result};
use colored::Colorize;
use lore_core::FileState;
use lore_ingest::list_reports;
use lore_ollama::OllamaClient;
use tokio::runtime::Runtime;

pub fn run(project: &Project) -> Result<()> {
    project.require_initialized()?;
    let config = project.config()?;
    let layout = &project.layout;

    println!("{}", "Lore Status".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Root: {}", layout.root.display());

    println!();
    println!("{}", "Intake".white().bold());
    let counts: Vec<(FileState, usize)> = FileState::ALL
        .into_iter()
        .map(|state| (state, count_files(layout.state_dir(state))))
        .collect();
    for (state, count) in &counts {
        let marker = match state {
            FileState::Raw => "○".yellow(),
            FileState::Processing => "◐".blue(),
            FileState::Completed => "●".green(),
            FileState::Failed => "✗".red(),
        };
        println!("  {} {:<11} {}", marker, format!("{}:", state), count);
    }

    let stuck = counts
        .iter()
        .find(|(state, _)| *state == FileState::Processing)
        .map(|(_, count)| *count)
        .unwrap_or(0);
    if stuck > 0 {
        println!(
            "  {}",
            format!(
                "{} file(s) left in processing/ by an interrupted run; move them back to raw/ to retry.",
                stuck
            )
            .dimmed()
        );
    }

    println!();
    println!("{}", "External Tools".white().bold());
    for (tool, available) in lore_process::check_dependencies() {
        if available {
            println!("  {} {}", "✓".green(), tool);
        } else {
            println!("  {} {} {}", "✗".red(), tool, "(not found)".dimmed());
        }
    }

    println!();
    println!("{}", "Ollama".white().bold());
    let client = OllamaClient::from_config(&config.ollama).context("Failed to create Ollama client")?;
    let rt = Runtime::new().context("Failed to create async runtime")?;

    if rt.block_on(client.is_available()) {
        println!("  {} reachable at {}", "✓".green(), client.host());
        for model in [&config.ollama.model, &config.ollama.vision_model] {
            match rt.block_on(client.has_model(model)) {
                Ok(true) => println!("  {} model {}", "✓".green(), model),
                Ok(false) => println!(
                    "  {} model {} {}",
                    "✗".red(),
                    model,
                    format!("(run 'ollama pull {}')", model).dimmed()
                ),
                Err(e) => println!("  {} model {} ({})", "?".yellow(), model, e),
            }
        }
    } else {
        println!("  {} not reachable at {}", "✗".red(), client.host());
    }

    let reports = list_reports(&layout.report_dir);
    println!();
    match reports.first() {
        Some(latest) => println!("{} {} ({} total)", "Latest report:".dimmed(), latest, reports.len()),
        None => println!("{}", "No pipeline reports yet.".dimmed()),
    }

    Ok(())
}
