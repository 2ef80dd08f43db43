//! Error types for the detection subsystem.

use ringwatch_core::RingwatchError;
use thiserror::Error;

/// Errors that can occur while bootstrapping or running a detector.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Invalid detector configuration.
    #[error("Invalid detector configuration: {0}")]
    Config(String),

    /// Two embeddings that must be compared have different shapes or layouts.
    #[error("Embedding shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A reference time range decoded to zero frames.
    #[error("Reference sequence at {start} in {source_id} contains no frames")]
    EmptyReference { source_id: String, start: String },

    /// Decoding, probing or acquisition failed.
    #[error(transparent)]
    Media(#[from] RingwatchError),

    /// The embedder failed to produce an embedding.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Writing the result table failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested model was not found in the cache.
    #[error("Model not found: {model_id} (expected at {path})")]
    ModelNotFound { model_id: String, path: String },

    /// Detection was cancelled between windows.
    #[error("Detection cancelled")]
    Cancelled,
}

/// Result type alias for detection operations.
pub type DetectResult<T> = std::result::Result<T, DetectError>;
