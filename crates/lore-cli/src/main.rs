//! Lore CLI - Knowledge intake pipeline

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use lore_core::TypeFilter;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Lore - turn raw seminar recordings, documents and images into a
/// structured knowledge base
#[derive(Parser)]
#[command(name = "lore")]
#[command(version)]
#[command(about = "Knowledge intake pipeline", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root (holds knowledge/, intake/ and logs/)
    #[arg(long, global = true, env = "LORE_ROOT", default_value = ".")]
    root: String,

    /// Config file (default: <root>/config/lore.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a project (directories and config)
    Init,

    /// Process every file waiting in the intake directory
    Run {
        /// Intake directory (default: <root>/intake/raw)
        #[arg(short, long)]
        input: Option<String>,

        /// Number of files processed concurrently
        #[arg(short, long, env = "LORE_WORKERS")]
        workers: Option<usize>,

        /// Only process one content type (text, video, audio, image, media)
        #[arg(short = 't', long = "type")]
        type_filter: Option<TypeFilter>,

        /// List what would be processed without processing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the verification pass
        #[arg(long)]
        no_verify: bool,

        /// Whisper model used for transcription
        #[arg(long)]
        whisper_model: Option<String>,
    },

    /// Show the report of a previous run
    Report {
        /// Run id or "latest"
        #[arg(default_value = "latest")]
        which: String,

        /// Print the human summary instead of the JSON report
        #[arg(short, long)]
        summary: bool,
    },

    /// Show intake status and tool availability
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("lore=debug,lore_ingest=debug,lore_process=debug,lore_ollama=debug,info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("lore=info,lore_ingest=info,lore_process=info,lore_ollama=info,warn")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let project = commands::Project::new(&cli.root, cli.config);

    let result = match cli.command {
        Commands::Init => commands::init::run(&project),
        Commands::Run {
            input,
            workers,
            type_filter,
            dry_run,
            no_verify,
            whisper_model,
        } => commands::run::run(
            &project,
            commands::run::RunArgs {
                input,
                workers,
                type_filter,
                dry_run,
                no_verify,
                whisper_model,
            },
        ),
        Commands::Report { which, summary } => commands::report::run(&project, &which, summary),
        Commands::Status => commands::status::run(&project),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(&project),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
