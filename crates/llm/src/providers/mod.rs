//! Concrete text generation providers.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::MockClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use std::time::Duration;

/// Default request timeout for provider HTTP clients.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build a reqwest client with the given timeout.
///
/// Falls back to a default client when the builder fails (TLS backend
/// initialisation is the only realistic failure and `Client::new` would hit
/// the same path lazily).
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client with timeout: {}", e);
            reqwest::Client::new()
        })
}
