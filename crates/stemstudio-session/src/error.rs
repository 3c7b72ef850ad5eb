//! Session error type.

use stemstudio_cache::CacheError;
use stemstudio_export::ExportError;
use stemstudio_mixer::MixError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Track not found: {0}")]
    TrackNotFound(Uuid),

    #[error("Metadata store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Mix(#[from] MixError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
