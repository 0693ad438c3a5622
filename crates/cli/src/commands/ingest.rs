//! Ingest command handler.
//!
//! Loads extracted regulation text into the similarity index.

use super::load_catalog;
use clap::Args;
use reglens_core::{config::AppConfig, AppResult};
use reglens_knowledge::{
    create_provider, embedding_settings, ingest_options, ingest_path, SqliteIndex,
};
use std::path::PathBuf;

/// Ingest regulation text files into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// File or directory of .txt / .md files
    pub path: PathBuf,

    /// Clear the index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.path);

        let catalog = load_catalog(config)?;
        let embedder = create_provider(&embedding_settings(config))?;
        let index = SqliteIndex::open(&config.index_path())?;

        let stats = ingest_path(
            &self.path,
            &index,
            embedder.as_ref(),
            &catalog,
            &ingest_options(config, self.reset),
        )
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            for document in &stats.documents {
                println!(
                    "{} -> {} ({} pages, {} chunks)",
                    document.source, document.regulation, document.pages, document.chunks
                );
            }
            println!(
                "Ingested {} documents ({} chunks, {} bytes) in {:.2}s",
                stats.documents.len(),
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
