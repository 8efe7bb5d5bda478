//! Error types for the company intelligence engine.
//!
//! Library crates use [`CompanyIntelError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enrichment operations.
#[derive(Debug, thiserror::Error)]
pub enum CompanyIntelError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during fetch, robots lookup, or search.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CompanyIntelError>;

impl CompanyIntelError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must propagate out of the orchestrator.
    ///
    /// Everything except persistence failures is recovered locally.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CompanyIntelError::config("cache_days must be positive");
        assert_eq!(err.to_string(), "config error: cache_days must be positive");

        let err = CompanyIntelError::validation("blank company name");
        assert!(err.to_string().contains("blank company name"));
    }

    #[test]
    fn only_storage_and_io_are_persistence() {
        assert!(CompanyIntelError::Storage("locked".into()).is_persistence());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(CompanyIntelError::io("/tmp/x", io).is_persistence());
        assert!(!CompanyIntelError::Network("timeout".into()).is_persistence());
        assert!(!CompanyIntelError::parse("bad html").is_persistence());
    }
}
