//! Provider identification.

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Ollama,
    Mock,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}
