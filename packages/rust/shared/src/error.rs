//! Error types for offliner.
//!
//! Library crates use [`OfflinerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all offliner operations.
#[derive(Debug, thiserror::Error)]
pub enum OfflinerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Connection, TLS or body-read failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("timed out fetching {0}")]
    Timeout(String),

    /// Markup or URL parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input path, unusable URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OfflinerError>;

impl OfflinerError {
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

    /// Whether this error came from the network layer (connection, status or timeout).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = OfflinerError::config("bad timeout");
        assert_eq!(err.to_string(), "config error: bad timeout");

        let err = OfflinerError::Http {
            url: "https://example.com/pic.jpg".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 for https://example.com/pic.jpg");
    }

    #[test]
    fn network_kinds_are_distinguishable() {
        assert!(OfflinerError::Timeout("https://example.com".into()).is_network());
        assert!(OfflinerError::Network("connection refused".into()).is_network());
        assert!(!OfflinerError::validation("nope").is_network());

        let io = OfflinerError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!io.is_network());
    }
}
