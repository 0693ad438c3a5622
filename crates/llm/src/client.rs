//! LLM client abstraction and request/response types.
//!
//! This module defines the core abstractions for interacting with text
//! generation providers. Calls are stateless: nothing is remembered between
//! two `complete` invocations.

use reglens_core::AppResult;
use serde::{Deserialize, Serialize};

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2", "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Ask the provider to emit a single JSON object
    #[serde(default)]
    pub json_output: bool,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            system: None,
            json_output: false,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Request JSON-formatted output.
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for LLM providers.
///
/// This trait abstracts the underlying provider (Ollama, OpenAI, a scripted
/// mock) and provides a unified completion interface. Implementations must
/// be safe to share between concurrently running pipelines.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    ///
    /// # Arguments
    /// * `request` - The completion request
    ///
    /// # Returns
    /// The complete LLM response
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("Classify this", "gpt-4o-mini")
            .with_system("You are a classifier")
            .with_temperature(0.0)
            .with_max_tokens(10)
            .with_json_output();

        assert_eq!(request.prompt, "Classify this");
        assert_eq!(request.system.as_deref(), Some("You are a classifier"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(10));
        assert!(request.json_output);
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
