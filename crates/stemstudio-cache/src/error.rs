//! Error types for the buffer cache.

use thiserror::Error;

/// Errors surfaced by `fetch_and_decode`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Network or HTTP failure retrieving a source. `status` is set for non-2xx responses.
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The payload is not decodable audio.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The fetch layer could not be constructed.
    #[error("Fetch client configuration error: {0}")]
    Client(String),

    #[error("Buffer cache has been disposed")]
    Disposed,
}

impl CacheError {
    pub(crate) fn fetch(url: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry. Decoding the same bytes
    /// again always fails the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Message suitable for the user, separating network from format problems.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Fetch { .. } | Self::Client(_) => {
                "Could not download the audio. Check your connection and try again."
            }
            Self::Decode(_) => "The audio file is unsupported or corrupt.",
            Self::Disposed => "The session has been closed.",
        }
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
