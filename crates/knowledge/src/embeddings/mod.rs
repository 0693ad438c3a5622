//! Embedding providers for the similarity index.
//!
//! The same provider must embed both the ingested chunks and the queries
//! searched against them; mixing providers silently ruins ranking.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider, EmbeddingSettings};
