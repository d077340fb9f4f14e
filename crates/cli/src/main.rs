//! Digm CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP API server
//! - `ask`     — Run one coaching query end to end and print the JSON answer
//! - `doctor`  — Diagnose configuration and collaborator health
//! - `config`  — Print the effective configuration (secrets redacted)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use digm_config::{AppConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "digm",
    about = "Digm — AI coach backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.digm/config.toml)
    #[arg(short, long, global = true, env = "DIGM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer one coaching query and print the result as JSON
    Ask {
        /// Bearer credential of the user asking
        #[arg(short, long, env = "DIGM_TOKEN")]
        token: String,

        /// The question to ask
        #[arg(short, long)]
        message: String,
    },

    /// Diagnose configuration and collaborator health
    Doctor,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };

    // Logging comes up before the config error is reported so that the
    // error itself is visible.
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging, cli.verbose);

    let config = config.map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask { token, message } => commands::ask::run(config, &token, &message).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
        Commands::Config => commands::config_cmd::show(&config)?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug, else the configured level.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
