use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Headless simulator for the portfolio page effects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ~/.config/folio/config.toml)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a page session and print what the effects did
    Run {
        /// Page description (TOML or JSON)
        page: PathBuf,
        /// Scripted session (TOML)
        #[arg(short = 's', long)]
        script: Option<PathBuf>,
        /// Simulated time to run for, in milliseconds
        #[arg(short = 'u', long)]
        until: Option<u64>,
        /// Drive frames on the wall clock instead of as fast as possible
        #[arg(long)]
        realtime: bool,
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print the final document state instead of the mutation log
        #[arg(long)]
        state: bool,
    },
    /// Validate a page description against the configuration
    Check {
        /// Page description (TOML or JSON)
        page: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Run {
            page,
            script,
            until,
            realtime,
            format,
            state,
        } => {
            let options = commands::run::RunOptions {
                page,
                script,
                until,
                realtime,
                format,
                state,
            };
            commands::run::run(config, options).await
        }
        Commands::Check { page } => commands::check::run(config, &page),
        Commands::Config => commands::config::run(&config, cli.config.as_deref()),
    }
}
