//! Autoignore CLI - Command-line interface for autoignore
//!
//! Lets you inspect and exercise a project's ignore rules: check paths,
//! list the effective patterns, walk the tree, or watch the rules file.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "autoignore")]
#[command(author = "Autoignore Contributors")]
#[command(version)]
#[command(about = "Ignore rules for project indexing, with live reload", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file (defaults to .auto-coder/ignore.json under the root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter .autocoderignore
    Init {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Check whether paths are ignored
    Check {
        /// Paths to check, absolute or relative
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Project root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Show which pattern decided
        #[arg(short, long)]
        explain: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the effective patterns
    Rules {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List files that are not ignored
    Scan {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Watch the rules file and report reloads until Ctrl+C
    Watch {
        /// Project root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init { path } => commands::init(&path, config),
        Commands::Check {
            paths,
            root,
            explain,
            json,
        } => commands::check(&root, config, &paths, explain, json),
        Commands::Rules { path } => commands::rules(&path, config),
        Commands::Scan { path } => commands::scan(&path, config),
        Commands::Watch { path } => commands::watch(&path, config).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
