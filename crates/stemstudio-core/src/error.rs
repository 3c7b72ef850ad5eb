//! Error types shared across Stem Studio.

use thiserror::Error;

/// Main error type for operations that do not belong to a single subsystem.
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Stem Studio operations.
pub type Result<T> = std::result::Result<T, StudioError>;
