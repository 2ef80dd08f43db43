//! Error types for Ringwatch.

use thiserror::Error;

/// Main error type for media and core operations.
#[derive(Error, Debug)]
pub enum RingwatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Acquisition error: {0}")]
    Acquisition(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core and media operations.
pub type Result<T> = std::result::Result<T, RingwatchError>;
