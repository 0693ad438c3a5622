//! Index command handler.

use clap::{Args, Subcommand};
use reglens_core::{config::AppConfig, AppResult};
use reglens_knowledge::SqliteIndex;

/// Similarity index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Show index statistics
    Stats(IndexStatsCommand),
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats command");

        let index = SqliteIndex::open_existing(&config.index_path())?;
        let stats = index.stats()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index: {}", index.path().display());
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(last) = stats.last_ingested_at {
                println!("  Last ingest: {}", last);
            }
            for count in &stats.by_regulation {
                println!("  {}: {} chunks", count.regulation, count.chunks);
            }
        }

        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}
