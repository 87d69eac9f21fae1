//! Fathom CLI
//!
//! Main entry point for the fathom command-line tool. Routes natural
//! language questions across the configured information sources and prints
//! the fused, attributed answer.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, HealthCommand};
use fathom_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Fathom - multi-source query routing and fusion
#[derive(Parser, Debug)]
#[command(name = "fathom")]
#[command(about = "Route questions across sources and fuse one attributed answer", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "FATHOM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question across the configured sources
    Ask(AskCommand),

    /// Show source health and cache statistics
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from file and environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.config, cli.log_level, cli.verbose, cli.no_color);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Fathom CLI starting");
    tracing::debug!(
        index = %config.sources.internal_index.endpoint,
        search = %config.sources.web_search.endpoint,
        "Source endpoints"
    );

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
