//! Command handlers for the Reglens CLI.
//!
//! This module organizes all CLI commands into separate submodules, plus the
//! wiring they share.

pub mod ask;
pub mod catalog;
pub mod index;
pub mod ingest;
pub mod prompts;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use catalog::CatalogCommand;
pub use index::IndexCommand;
pub use ingest::IngestCommand;
pub use prompts::PromptsCommand;
pub use serve::ServeCommand;

use reglens_core::{config::AppConfig, AppError, AppResult};
use reglens_knowledge::{open_search, RegulationCatalog, SimilaritySearch};
use reglens_llm::{create_client, LlmClient};
use reglens_pipeline::Pipeline;
use std::sync::Arc;
use std::time::Duration;

/// Regulation catalog for the workspace, falling back to the built-in one.
pub fn load_catalog(config: &AppConfig) -> AppResult<RegulationCatalog> {
    RegulationCatalog::load(&config.catalog_path())
}

/// Text generation client for the configured provider.
pub fn build_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;

    let api_key = config.resolve_api_key(&config.provider);
    create_client(
        &config.provider,
        config.provider_endpoint(),
        api_key.as_deref(),
        Duration::from_secs(config.provider_timeout_secs()),
    )
    .map_err(AppError::Config)
}

/// Answer pipeline over the workspace index.
pub fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let llm = build_llm(config)?;
    let search: Arc<dyn SimilaritySearch> = Arc::new(open_search(config)?);
    let catalog = Arc::new(load_catalog(config)?);

    tracing::debug!(
        "Building answer pipeline with {} and {} catalog regulations",
        llm.provider_name(),
        catalog.len()
    );

    Pipeline::from_config(config, llm, search, catalog)
}
