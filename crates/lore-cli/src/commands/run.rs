//! Run command - process the intake directory.

use super::{expand_path, format_size, Project};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lore_config::Config;
use lore_core::{FileDescriptor, TypeFilter};
use lore_ingest::{Pipeline, RunOptions, RunOutcome};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Command-line overrides for a run.
pub struct RunArgs {
    pub input: Option<String>,
    pub workers: Option<usize>,
    pub type_filter: Option<TypeFilter>,
    pub dry_run: bool,
    pub no_verify: bool,
    pub whisper_model: Option<String>,
}

impl RunArgs {
    /// Fold the overrides into `config` and build the run options.
    fn apply(&self, config: &mut Config) -> RunOptions {
        if self.no_verify {
            config.pipeline.verify = false;
        }
        if let Some(model) = &self.whisper_model {
            config.processing.whisper_model = model.clone();
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if self.type_filter.is_some() {
            config.pipeline.type_filter = self.type_filter;
        }

        RunOptions {
            input_dir: self.input.as_deref().map(expand_path),
            dry_run: self.dry_run,
            ..RunOptions::from_config(config)
        }
    }
}

pub fn run(project: &Project, args: RunArgs) -> Result<()> {
    project.require_initialized()?;
    let mut config = project.config()?;
    let options = args.apply(&mut config);
    debug!("Run options: {:?}", options);

    if let Some(input) = &options.input_dir {
        if !input.is_dir() {
            anyhow::bail!("Input directory does not exist: {}", input.display());
        }
    }

    let pipeline = Pipeline::from_config(project.layout.clone(), &config)
        .context("Failed to set up the pipeline")?;
    let rt = Runtime::new().context("Failed to create async runtime")?;

    let pb = if options.dry_run {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.set_message(format!("Processing intake with {} workers", options.workers));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let outcome = rt.block_on(pipeline.run(&options));
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    match outcome? {
        RunOutcome::Empty => {
            println!("{}", "No supported files found in the intake directory.".yellow());
        }
        RunOutcome::DryRun(files) => print_dry_run(&files),
        RunOutcome::Completed { report, path } => {
            report.print_summary();
            println!();
            println!("{} {}", "Report:".dimmed(), project.layout.relative(&path));
            if report.results.failed > 0 {
                println!(
                    "{}",
                    format!("{} file(s) moved to intake/failed/", report.results.failed).yellow()
                );
            }
        }
    }

    Ok(())
}

fn print_dry_run(files: &[FileDescriptor]) {
    println!("{} {} files", "Would process:".cyan().bold(), files.len());

    let mut total = 0u64;
    for file in files {
        let size = std::fs::metadata(&file.path).map(|m| m.len()).unwrap_or(0);
        total += size;
        println!(
            "  {} {} ({:.1} KB)",
            format!("[{}]", file.kind).dimmed(),
            file.name(),
            size as f64 / 1024.0
        );
    }

    println!();
    println!("Total: {}", format_size(total));
    println!("{}", "Dry run - no files were moved or written.".cyan());
}
