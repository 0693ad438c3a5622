//! LLM provider factory.
//!
//! This module creates LLM clients from configuration values. The pipeline
//! receives the resulting `Arc<dyn LlmClient>` once at construction time and
//! shares it (and its connection pool) across concurrent runs.

use crate::client::LlmClient;
use crate::providers::{MockClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama", "mock")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)))
        }
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or("https://api.openai.com");
            Ok(Arc::new(OpenAiClient::with_timeout(
                base_url, api_key, timeout,
            )))
        }
        ProviderType::Mock => Ok(Arc::new(MockClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None, TIMEOUT);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, TIMEOUT) {
            Err(err) => assert!(err.contains("OpenAI provider requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("OpenAI", None, Some("sk-test"), TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_create_mock_client() {
        let client = create_client("mock", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "mock");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, TIMEOUT) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
