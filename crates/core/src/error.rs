//! Error types for Reglens.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, text generation, retrieval,
//! prompts, pipeline control, and serialization.

use thiserror::Error;

/// Unified error type for Reglens.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic on external input; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text generation capability errors (network, auth, bad status)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Similarity search and index errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Pipeline control errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An external capability did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means an external dependency (generation or
    /// search capability) could not be reached or answered.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::Retrieval(_) | AppError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_failures() {
        assert!(AppError::Llm("down".to_string()).is_capability_failure());
        assert!(AppError::Retrieval("down".to_string()).is_capability_failure());
        assert!(AppError::Timeout("slow".to_string()).is_capability_failure());
        assert!(!AppError::Config("bad".to_string()).is_capability_failure());
        assert!(!AppError::Pipeline("bad".to_string()).is_capability_failure());
    }

    #[test]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Serialization(_)));
    }
}
