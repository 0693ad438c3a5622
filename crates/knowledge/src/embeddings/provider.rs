//! Embedding provider trait and factory.

use super::providers::{OllamaProvider, TrigramProvider};
use reglens_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Retrieval("No embedding returned".to_string()))
    }
}

/// Settings needed to construct an embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// "trigram" or "ollama"
    pub provider: String,
    pub dimensions: usize,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

/// Create an embedding provider from settings.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if settings.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match settings.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimensions))),

        "ollama" => {
            let model = settings.model.as_deref().unwrap_or("nomic-embed-text");
            let provider = OllamaProvider::new(
                settings.endpoint.as_deref(),
                model,
                settings.dimensions,
                settings.timeout,
            );
            Ok(Arc::new(provider))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            other
        ))),
    }
}
