//! Error types for LexForge.
//!
//! Library crates use [`LexForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LexForge operations.
#[derive(Debug, thiserror::Error)]
pub enum LexForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Document acquisition error (unreadable input, bad format).
    #[error("collection error: {0}")]
    Collection(String),

    /// A stage failed while processing a record.
    #[error("processing error in stage '{stage}': {message}")]
    Processing { stage: String, message: String },

    /// Corpus or manifest persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad thresholds, empty pipeline, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LexForgeError>;

impl LexForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a processing error scoped to a stage name.
    pub fn processing(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Processing {
            stage: stage.into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LexForgeError::config("unknown dedup method 'fuzzy'");
        assert_eq!(err.to_string(), "config error: unknown dedup method 'fuzzy'");

        let err = LexForgeError::processing("quality_scorer", "empty weight map");
        assert!(err.to_string().contains("quality_scorer"));

        let err = LexForgeError::validation("pipeline must have at least one stage");
        assert!(err.to_string().contains("at least one stage"));
    }
}
