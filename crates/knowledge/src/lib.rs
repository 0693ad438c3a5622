//! Regulation knowledge: catalog, passages, and the similarity index.
//!
//! Provides local-first retrieval using SQLite and embeddings, plus the
//! [`SimilaritySearch`] seam the answer pipeline searches through.

pub mod catalog;
pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use catalog::{RegulationCatalog, RegulationEntry, UNKNOWN_REGULATION};
pub use embeddings::{create_provider, EmbeddingProvider, EmbeddingSettings};
pub use index::SqliteIndex;
pub use ingest::ingest_path;
pub use search::{IndexedSearch, SearchCall, SimilaritySearch, StaticSearch};
pub use types::{
    IndexStats, IndexedChunk, IngestOptions, IngestStats, IngestedDocument, Passage,
    PassageMetadata, RegulationCount, SearchFilter,
};

use reglens_core::{AppConfig, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Embedding settings derived from the application configuration.
///
/// The Ollama embedder reuses the Ollama provider endpoint when that is the
/// active text generation provider.
pub fn embedding_settings(config: &AppConfig) -> EmbeddingSettings {
    let endpoint = if config.provider == "ollama" {
        config.provider_endpoint().map(str::to_string)
    } else {
        None
    };

    EmbeddingSettings {
        provider: config.retrieval.embedding_provider.clone(),
        dimensions: config.retrieval.dimensions,
        model: config
            .retrieval
            .embedding_model
            .clone()
            .or_else(|| config.provider_embedding_model().map(str::to_string)),
        endpoint,
        timeout: Duration::from_secs(config.pipeline.capability_timeout_secs),
    }
}

/// Ingestion options derived from the application configuration.
pub fn ingest_options(config: &AppConfig, reset: bool) -> IngestOptions {
    IngestOptions {
        chunk_size: config.retrieval.chunk_size,
        chunk_overlap: config.retrieval.chunk_overlap,
        reset,
    }
}

/// Open the workspace index for serving queries.
pub fn open_search(config: &AppConfig) -> AppResult<IndexedSearch> {
    let index = SqliteIndex::open_existing(&config.index_path())?;
    let embedder: Arc<dyn EmbeddingProvider> = create_provider(&embedding_settings(config))?;

    tracing::info!(
        "Opened similarity index at {:?} (embeddings: {} / {})",
        index.path(),
        embedder.provider_name(),
        embedder.model_name()
    );

    Ok(IndexedSearch::new(index, embedder))
}
