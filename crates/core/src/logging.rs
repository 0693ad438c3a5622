//! Logging infrastructure for Reglens.
//!
//! This module initializes the tracing subscriber for structured logging.
//! All logs are emitted to stderr to keep stdout clean for data output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a log format name ("pretty", "text", "json").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber with stderr output.
///
/// This sets up structured logging with:
/// - Output to stderr (stdout is reserved for data)
/// - Environment-based filtering (RUST_LOG or provided level)
/// - Human-readable or JSON format
/// - Optional ANSI color control
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "info")
/// * `no_color` - Disable colored output
/// * `format` - Output format
///
/// # Example
/// ```no_run
/// use reglens_core::logging::{init_logging, LogFormat};
///
/// init_logging(None, false, LogFormat::Pretty).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!no_color && supports_color()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("TEXT"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let result = init_logging(Some("reglens=loud"), true, LogFormat::Pretty);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
