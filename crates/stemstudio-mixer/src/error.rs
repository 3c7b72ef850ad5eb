//! Error types for mix coordination.

use thiserror::Error;

/// Errors from stem and transport operations.
///
/// Missing audio is never an error here: a stem without a decoded buffer
/// simply renders silence until the buffer resolves.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MixError {
    #[error("Unknown stem: {0}")]
    UnknownStem(String),

    #[error("Duplicate stem id: {0}")]
    DuplicateStem(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// Result type alias for mixer operations.
pub type MixResult<T> = std::result::Result<T, MixError>;
