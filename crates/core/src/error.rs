//! Error types for the docqa engine.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! remote-capability, store, prompt, and serialization failures.
//!
//! SQL validation rejections are deliberately *not* part of this enum:
//! they are terminal, user-facing outcomes of the NL-to-SQL pipeline and
//! are modeled separately in the engine crate.

use thiserror::Error;

/// Unified error type for docqa.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (also raised for embedding dimension
    /// mismatches, which are configuration mistakes rather than runtime
    /// conditions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The embedding service failed or is unreachable. Callers on the
    /// retrieval path degrade to a zero vector instead of aborting.
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The generation service failed or is unreachable. Surfaced once to
    /// the caller; no hidden retry loop.
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// A generation call exceeded its bounded timeout and was abandoned.
    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    /// Vector or tabular store plumbing errors
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
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
    fn test_timeout_display_carries_seconds() {
        let err = AppError::GenerationTimeout(30);
        assert_eq!(err.to_string(), "Generation timed out after 30s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
