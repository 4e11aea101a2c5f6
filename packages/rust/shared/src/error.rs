//! Error types for the curriculum tools.
//!
//! Library crates use [`CurriculumError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::LookupLevel;

/// Top-level error type for all curriculum operations.
#[derive(Debug, thiserror::Error)]
pub enum CurriculumError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The record source could not produce records (unreadable file, malformed table).
    #[error("source read error: {0}")]
    SourceRead(String),

    /// Document store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad flag value, unexpected document shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON encoding or decoding of a structure failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lookup path does not exist in the finalized structure or store.
    #[error("{level} not found: '{key}'")]
    NotFound { level: LookupLevel, key: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CurriculumError>;

impl CurriculumError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source read error from any displayable message.
    pub fn source_read(msg: impl Into<String>) -> Self {
        Self::SourceRead(msg.into())
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

    /// Create a lookup miss for `key` at `level`.
    pub fn not_found(level: LookupLevel, key: impl Into<String>) -> Self {
        Self::NotFound {
            level,
            key: key.into(),
        }
    }

    /// Whether this error is a lookup miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CurriculumError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
