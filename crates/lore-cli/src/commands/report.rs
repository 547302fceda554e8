//! Report command - display a stored run report.

use super::Project;
use anyhow::{Context, Result};
use colored::Colorize;
use lore_ingest::{find_report, PipelineReport, ReportLookup};

pub fn run(project: &Project, which: &str, summary: bool) -> Result<()> {
    let report_dir = &project.layout.report_dir;

    let path = match find_report(report_dir, which) {
        ReportLookup::Found(path) => path,
        ReportLookup::Empty => {
            println!("{}", "No pipeline reports yet. Run 'lore run' first.".yellow());
            return Ok(());
        }
        ReportLookup::NotFound { available } => {
            println!("{} No report with id {}", "Note:".yellow().bold(), which.cyan());
            println!();
            println!("{}", "Available reports:".white().bold());
            for id in available {
                println!("  {} {}", "•".dimmed(), id);
            }
            return Ok(());
        }
    };

    if summary {
        let report = PipelineReport::load(&path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        report.print_summary();
    } else {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        print!("{}", contents);
    }

    Ok(())
}
