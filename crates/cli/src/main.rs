//! Reglens CLI
//!
//! Main entry point for the reglens command-line tool.
//! Answers questions about AI and model risk regulations from a local index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CatalogCommand, IndexCommand, IngestCommand, PromptsCommand, ServeCommand,
};
use reglens_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppError, AppResult,
};
use std::path::PathBuf;
use tracing::Instrument;

/// Reglens - cited, verified answers about AI regulations
#[derive(Parser, Debug)]
#[command(name = "reglens")]
#[command(about = "Cited, verified answers about AI and model risk regulations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REGLENS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REGLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Text generation provider (ollama, openai, mock)
    #[arg(short, long, global = true, env = "REGLENS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "REGLENS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about the ingested regulations
    Ask(AskCommand),

    /// Serve the question answering HTTP API
    Serve(ServeCommand),

    /// Ingest regulation text into the similarity index
    Ingest(IngestCommand),

    /// Similarity index management
    Index(IndexCommand),

    /// Show the regulation catalog
    Catalog(CatalogCommand),

    /// List prompt definitions
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration for the selected workspace
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    let log_format = match config.log_format.as_deref() {
        None => LogFormat::default(),
        Some(name) => LogFormat::parse(name)
            .ok_or_else(|| AppError::Config(format!("Unknown log format: {}", name)))?,
    };

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Reglens CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .reglens directory exists
    config.ensure_reglens_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::Index(_) => "index",
        Commands::Catalog(_) => "catalog",
        Commands::Prompts(_) => "prompts",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Ingest(cmd) => cmd.execute(&config).await,
            Commands::Index(cmd) => cmd.execute(&config).await,
            Commands::Catalog(cmd) => cmd.execute(&config).await,
            Commands::Prompts(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
