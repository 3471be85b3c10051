//! Error types for docweave.
//!
//! Library crates use [`DocweaveError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Markup problems are never errors: the parser degrades to best-effort
//! structure instead. Only filesystem and configuration failures surface here,
//! and all of them end the current run.

use std::path::PathBuf;

/// Top-level error type for all docweave operations.
#[derive(Debug, thiserror::Error)]
pub enum DocweaveError {
    /// The input root does not exist or is not a directory.
    #[error("input root not found: {path:?}")]
    NotFound { path: PathBuf },

    /// An input file (or directory entry) could not be read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An output artifact could not be written.
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// JSON artifact serialization error.
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocweaveError>;

impl DocweaveError {
    /// Create a not-found error for a missing input root.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Wrap a `std::io::Error` raised while reading input.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` raised while writing output.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocweaveError::config("unknown field `sitee`");
        assert_eq!(err.to_string(), "config error: unknown field `sitee`");

        let err = DocweaveError::not_found("/no/such/dir");
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DocweaveError::write("out/index.html", io);
        assert!(err.to_string().starts_with("failed to write"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
