//! Stem Studio Core - Foundation types for the stem mixing engine
//!
//! This crate provides the types shared by every other Stem Studio crate:
//! - Decoded PCM audio (`AudioBuffer`)
//! - The `BufferLookup` seam through which playback resolves buffers
//! - Shared error type
//! - Cache budget defaults

pub mod buffer;
pub mod error;

pub use buffer::{AudioBuffer, BufferLookup, SharedBuffer};
pub use error::{Result, StudioError};

/// Default budgets for the decoded buffer cache.
pub mod cache_budget {
    /// Total decoded PCM held in memory.
    pub const MAX_CACHE_SIZE_BYTES: usize = 500 * 1024 * 1024; // 500 MB

    /// Maximum number of decoded stems kept at once.
    pub const MAX_CACHE_ENTRIES: usize = 100;

    /// Maximum number of keys waiting for background preload.
    pub const PRELOAD_QUEUE_SIZE: usize = 10;

    /// Pause between two background preload fetches.
    pub const PRELOAD_DELAY_MS: u64 = 100;

    /// Timeout handed to the fetch layer.
    pub const FETCH_TIMEOUT_MS: u64 = 30_000;

    /// Maximum age of a cached entry (audio provider keeps files for 15 days).
    pub const MAX_ENTRY_AGE_MS: u64 = 14 * 24 * 60 * 60 * 1000;

    /// Bytes per decoded sample (32-bit float).
    pub const BYTES_PER_SAMPLE: usize = 4;
}
