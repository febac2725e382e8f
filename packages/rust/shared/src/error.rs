//! Error types for LeadScout.
//!
//! Library crates use [`EnrichError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during search, directory lookup, or page fetch.
    #[error("network error: {0}")]
    Network(String),

    /// Response body or HTML parsing error.
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

    /// Data validation error (bad record, illegal state transition, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The search endpoint answered HTTP 429 for one query.
    #[error("search endpoint throttled query: {query}")]
    Throttled { query: String },

    /// Daily search quota used up, or too many consecutive throttles.
    ///
    /// This is the only error that halts a worker's slice of records.
    #[error(
        "search quota exceeded ({queries_today}/{daily_limit} queries today, \
         {consecutive_throttled} consecutive throttles)"
    )]
    QuotaExceeded {
        queries_today: u64,
        daily_limit: u64,
        consecutive_throttled: u32,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnrichError>;

impl EnrichError {
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

    /// True for the batch-halting quota condition.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EnrichError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = EnrichError::validation("review status without completion");
        assert!(err.to_string().contains("review status"));
    }

    #[test]
    fn quota_exceeded_is_distinguished() {
        let err = EnrichError::QuotaExceeded {
            queries_today: 100,
            daily_limit: 100,
            consecutive_throttled: 0,
        };
        assert!(err.is_quota_exceeded());
        assert!(err.to_string().contains("100/100"));

        let err = EnrichError::Throttled {
            query: "acme plumbing".into(),
        };
        assert!(!err.is_quota_exceeded());
    }
}
