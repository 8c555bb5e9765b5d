//! Error types for LeadMerge.
//!
//! Library crates use [`LeadMergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-record anomalies (missing keys, odd value types) are never errors;
//! only whole-source failures and bad configuration surface here.

use std::path::PathBuf;

/// Top-level error type for all LeadMerge operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadMergeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A source or reference file could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Invalid input shape or argument (bad source spec, empty run, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadMergeError>;

impl LeadMergeError {
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
}
