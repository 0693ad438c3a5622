//! Similarity search client.
//!
//! The answer pipeline depends only on [`SimilaritySearch`]. Production code
//! plugs in [`IndexedSearch`]; tests use [`StaticSearch`], which serves a
//! fixed corpus and records every call.

use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteIndex;
use crate::types::{Passage, SearchFilter};
use reglens_core::{AppError, AppResult};
use std::sync::{Arc, Mutex};

/// Nearest-neighbour search over regulation passages.
#[async_trait::async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return at most `k` passages ranked by relevance, most similar first.
    ///
    /// With a filter only passages of that regulation are returned. Fewer
    /// than `k` results (including none) is not an error.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<Vec<Passage>>;
}

/// Search backed by the SQLite index and an embedding provider.
#[derive(Debug, Clone)]
pub struct IndexedSearch {
    index: SqliteIndex,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexedSearch {
    pub fn new(index: SqliteIndex, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }
}

#[async_trait::async_trait]
impl SimilaritySearch for IndexedSearch {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<Vec<Passage>> {
        let embedding = self.embedder.embed(query).await?;

        let index = self.index.clone();
        let filter = filter.cloned();
        tokio::task::spawn_blocking(move || index.query(&embedding, k, filter.as_ref()))
            .await
            .map_err(|e| AppError::Retrieval(format!("Search task failed: {}", e)))?
    }
}

/// One recorded call to [`StaticSearch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub k: usize,
    pub filter: Option<SearchFilter>,
}

/// In-memory search over a fixed corpus, for tests and demos.
///
/// Results keep corpus order (treated as rank order), are filtered by exact
/// regulation match, and truncated to `k`.
#[derive(Debug, Default)]
pub struct StaticSearch {
    corpus: Vec<Passage>,
    failure: Option<String>,
    calls: Mutex<Vec<SearchCall>>,
}

impl StaticSearch {
    pub fn new(corpus: Vec<Passage>) -> Self {
        Self {
            corpus,
            ..Self::default()
        }
    }

    /// A search that always returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A search that fails every call like an unreachable index.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SimilaritySearch for StaticSearch {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<Vec<Passage>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SearchCall {
                query: query.to_string(),
                k,
                filter: filter.cloned(),
            });
        }

        if let Some(ref message) = self.failure {
            return Err(AppError::Retrieval(message.clone()));
        }

        Ok(self
            .corpus
            .iter()
            .filter(|p| filter.map_or(true, |f| p.metadata.regulation == f.regulation))
            .take(k)
            .cloned()
            .collect())
    }
}
