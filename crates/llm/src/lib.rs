//! Text generation capability for Reglens.
//!
//! This crate provides a provider-agnostic abstraction over completion
//! services. The answer pipeline only ever sees the [`LlmClient`] trait, so
//! providers can be swapped (or stubbed in tests) without touching it.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Chat completions API (and compatible servers)
//! - **Mock**: Scripted responses for tests and offline runs
//!
//! # Example
//! ```no_run
//! use reglens_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
