//! OpenAI chat completions provider.
//!
//! Works against api.openai.com and any server exposing the same
//! `/v1/chat/completions` contract.

use super::{http_client, DEFAULT_TIMEOUT_SECS};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use reglens_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI chat completions client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_OPENAI_URL, api_key)
    }

    /// Create a client for a custom OpenAI-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_timeout(base_url, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http_client(timeout),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending chat completion request to OpenAI with model: {}", request.model);

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        tracing::debug!(
            "Received completion from OpenAI: {} prompt tokens, {} completion tokens",
            usage.prompt_tokens,
            usage.completion_tokens
        );

        Ok(LlmResponse {
            content,
            model: chat.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_with_system() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("Question", "gpt-4o")
            .with_system("Rules")
            .with_temperature(0.0);

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[0].content, "Rules");
        assert_eq!(chat.messages[1].role, "user");
        assert!(chat.response_format.is_none());
    }

    #[test]
    fn test_json_output_sets_response_format() {
        let client = OpenAiClient::new("sk-test");
        let chat = client.to_chat_request(&LlmRequest::new("Q", "gpt-4o-mini").with_json_output());
        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "LOOKUP"}}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 1}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "LOOKUP");
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 50);
    }
}
