//! Cache configuration.

use crate::store::CacheLimits;
use serde::{Deserialize, Serialize};
use stemstudio_core::cache_budget;
use std::time::Duration;

/// Capacity and scheduling settings for a [`BufferCache`](crate::BufferCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on the summed decoded size of all entries.
    pub max_size_bytes: usize,
    /// Upper bound on the number of entries.
    pub max_entries: usize,
    /// Upper bound on keys waiting in the preload queue.
    pub preload_queue_size: usize,
    /// Pause between two preload fetches, in milliseconds.
    pub preload_delay_ms: u64,
    /// Timeout handed to the HTTP fetch layer, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Entries older than this (since admission) count as misses. `None` disables expiry.
    pub max_entry_age_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: cache_budget::MAX_CACHE_SIZE_BYTES,
            max_entries: cache_budget::MAX_CACHE_ENTRIES,
            preload_queue_size: cache_budget::PRELOAD_QUEUE_SIZE,
            preload_delay_ms: cache_budget::PRELOAD_DELAY_MS,
            fetch_timeout_ms: cache_budget::FETCH_TIMEOUT_MS,
            max_entry_age_ms: Some(cache_budget::MAX_ENTRY_AGE_MS),
        }
    }
}

impl CacheConfig {
    /// Budget with the given size and entry bounds, other settings default.
    pub fn with_limits(max_size_bytes: usize, max_entries: usize) -> Self {
        Self {
            max_size_bytes,
            max_entries,
            ..Self::default()
        }
    }

    /// Capacity bounds used at admission. A zero entry bound is raised to one.
    pub fn limits(&self) -> CacheLimits {
        CacheLimits {
            max_size_bytes: self.max_size_bytes,
            max_entries: self.max_entries.max(1),
        }
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn max_entry_age(&self) -> Option<Duration> {
        self.max_entry_age_ms.map(Duration::from_millis)
    }
}
