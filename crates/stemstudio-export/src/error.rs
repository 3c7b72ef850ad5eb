//! Error types for mix export.

use stemstudio_cache::CacheError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Every stem is muted, silenced by solo, or has no audio.
    #[error("No active stems to export")]
    NoActiveStems,

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Export cancelled")]
    Cancelled,

    /// A stem's audio could not be fetched or decoded.
    #[error("Stem audio unavailable: {0}")]
    Source(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Message suitable for the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoActiveStems => "Unmute at least one stem before exporting.".into(),
            Self::Cancelled => "Export cancelled.".into(),
            Self::Source(e) => e.user_message().into(),
            other => format!("Export failed: {other}"),
        }
    }
}

/// Result type alias for export operations.
pub type ExportResult<T> = std::result::Result<T, ExportError>;
