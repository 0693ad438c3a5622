//! Ollama embedding provider.
//!
//! Calls Ollama's `/api/embeddings` endpoint (one text per request) with a
//! short exponential backoff on transient failures.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use reglens_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider; nothing is sent until the first embedding request.
    pub fn new(base_url: Option<&str>, model: &str, dimensions: usize, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            dimensions,
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}): {}. Retrying in {}ms",
                        attempt, MAX_ATTEMPTS, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Retrieval(format!("Failed to send embedding request to Ollama: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);
            return Err(AppError::Retrieval(format!(
                "Ollama embeddings error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse Ollama embedding response: {}", e))
        })?;

        check_dimensions(&body.embedding, self.dimensions)?;
        Ok(body.embedding)
    }
}

fn check_dimensions(embedding: &[f32], expected: usize) -> AppResult<()> {
    if embedding.len() != expected {
        return Err(AppError::Retrieval(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                warn!("Empty text at index {}, using zero vector", i);
                embeddings.push(vec![0.0; self.dimensions]);
                continue;
            }
            embeddings.push(self.embed_with_retries(text).await?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_default_and_trim() {
        let provider = OllamaProvider::new(None, "nomic-embed-text", 768, Duration::from_secs(1));
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);

        let provider = OllamaProvider::new(
            Some("http://gpu-box:11434/"),
            "nomic-embed-text",
            768,
            Duration::from_secs(1),
        );
        assert_eq!(provider.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[0.0; 4], 4).is_ok());
        assert!(check_dimensions(&[0.0; 3], 4).is_err());
    }

    #[tokio::test]
    async fn test_empty_texts_skip_network() {
        // Port 9 is discard; nothing is sent for blank input anyway
        let provider = OllamaProvider::new(
            Some("http://127.0.0.1:9"),
            "nomic-embed-text",
            8,
            Duration::from_millis(100),
        );
        let embeddings = provider
            .embed_batch(&["".to_string(), "  ".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings, vec![vec![0.0; 8], vec![0.0; 8]]);
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "model risk",
        })
        .unwrap();
        assert_eq!(json["model"], "nomic-embed-text");
        assert_eq!(json["prompt"], "model risk");
    }
}
