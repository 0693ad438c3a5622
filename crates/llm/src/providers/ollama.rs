//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use super::{http_client, DEFAULT_TIMEOUT_SECS};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use reglens_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
    stream: bool,
}

/// Sampling options nested under `options` in the Ollama API.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new Ollama client with a custom base URL and request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout),
        }
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama with model: {}", request.model);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        // For non-streaming, Ollama returns a single JSON object
        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Received completion from Ollama: {} prompt tokens, {} completion tokens",
            ollama_response.prompt_eval_count.unwrap_or(0),
            ollama_response.eval_count.unwrap_or(0)
        );

        Ok(self.convert_response(ollama_response))
    }
}
