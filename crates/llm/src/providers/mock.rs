//! Scripted provider for tests and offline runs.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use reglens_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply.
#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Failure(String),
}

/// Mock client returning canned completions in order.
///
/// Every request is recorded so tests can assert on the prompts the
/// pipeline built. When the script runs dry, `fallback` is returned if set,
/// otherwise the call fails like an unreachable provider would.
#[derive(Debug, Default)]
pub struct MockClient {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that replies with `responses` in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Reply with `text` once the script is exhausted.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Queue a successful completion.
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_script().push_back(Scripted::Text(text.into()));
    }

    /// Queue a provider failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script()
            .push_back(Scripted::Failure(message.into()));
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        // A poisoned script only happens after a panicking test; keep going.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.lock_script().pop_front();
        let content = match next {
            Some(Scripted::Text(text)) => text,
            Some(Scripted::Failure(message)) => return Err(AppError::Llm(message)),
            None => self.fallback.clone().ok_or_else(|| {
                AppError::Llm("Mock provider has no scripted response left".to_string())
            })?,
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
