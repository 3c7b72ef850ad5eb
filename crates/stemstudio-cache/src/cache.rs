//! Decoded buffer cache: fetch + decode orchestration over the store.
//!
//! `BufferCache` is a cheap clonable handle; every clone shares the same
//! store, statistics and preload queue. Admission and eviction happen under a
//! single lock and never span an await point, so two admissions cannot
//! interleave. Interactive fetches are never queued behind preloads; when both
//! decode the same key the later admission replaces the earlier one.

use crate::config::CacheConfig;
use crate::decode::{AudioDecoder, SymphoniaDecoder};
use crate::error::{CacheError, CacheResult};
use crate::fetch::{Fetcher, SchemeFetcher};
use crate::preload::{PreloadQueue, QueuePush};
use crate::store::{Admission, DecodedBufferStore};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use stemstudio_core::{BufferLookup, SharedBuffer};
use tracing::{debug, info, warn};

/// Snapshot of cache occupancy and effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Summed decoded size of all entries, in bytes.
    pub total_size: usize,
    pub entry_count: usize,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    /// Last-access time of the least recently used entry.
    pub oldest_entry_timestamp: Option<SystemTime>,
}

struct CacheInner {
    config: CacheConfig,
    store: Mutex<DecodedBufferStore>,
    preload: Mutex<PreloadQueue>,
    preload_running: AtomicBool,
    disposed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn AudioDecoder>,
}

/// Bounded cache of decoded audio keyed by source URL.
#[derive(Clone)]
pub struct BufferCache {
    inner: Arc<CacheInner>,
}

impl BufferCache {
    /// Create a cache with injected fetch and decode capabilities.
    pub fn new(
        config: CacheConfig,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        info!(
            max_size_bytes = config.max_size_bytes,
            max_entries = config.max_entries,
            preload_queue_size = config.preload_queue_size,
            "Creating buffer cache"
        );
        let preload = PreloadQueue::new(config.preload_queue_size);
        Self {
            inner: Arc::new(CacheInner {
                config,
                store: Mutex::new(DecodedBufferStore::new()),
                preload: Mutex::new(preload),
                preload_running: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                fetcher,
                decoder,
            }),
        }
    }

    /// Cache fetching over HTTP(S) or from disk and decoding with symphonia.
    pub fn with_default_io(config: CacheConfig) -> CacheResult<Self> {
        let fetcher = SchemeFetcher::new(config.fetch_timeout())?;
        Ok(Self::new(config, Arc::new(fetcher), Arc::new(SymphoniaDecoder)))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Membership check without side effects.
    pub fn has(&self, key: &str) -> bool {
        self.inner.store.lock().contains(key)
    }

    /// Look up a buffer, recording a hit or miss. Expired entries are
    /// dropped and count as misses.
    pub fn get(&self, key: &str) -> Option<SharedBuffer> {
        let found = self.touch_live(key);
        if found.is_some() {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Refresh recency for a live entry without touching hit/miss counters.
    fn touch_live(&self, key: &str) -> Option<SharedBuffer> {
        let now = SystemTime::now();
        let mut store = self.inner.store.lock();
        if let Some(max_age) = self.inner.config.max_entry_age() {
            if store.is_expired(key, now, max_age) {
                store.remove(key);
                debug!(key, "Cache entry expired");
            }
        }
        store.touch(key, now)
    }

    /// Admit a buffer, evicting least-recently-used entries until it fits.
    /// A disposed cache admits nothing.
    pub fn set(&self, key: impl Into<String>, buffer: impl Into<SharedBuffer>) -> Admission {
        let key = key.into();
        if self.is_disposed() {
            debug!(key = %key, "Cache disposed; buffer not admitted");
            return Admission::default();
        }
        let buffer = buffer.into();
        let size_bytes = buffer.size_bytes();
        let limits = self.inner.config.limits();

        let (admission, total_size, entry_count) = {
            let mut store = self.inner.store.lock();
            let admission = store.admit(key.clone(), buffer, limits, SystemTime::now());
            (admission, store.total_size(), store.len())
        };

        if !admission.evicted.is_empty() {
            debug!(
                key = %key,
                evicted = ?admission.evicted,
                "Evicted least recently used buffers"
            );
        }
        if admission.over_capacity {
            warn!(
                key = %key,
                size_bytes,
                max_size_bytes = limits.max_size_bytes,
                "Buffer exceeds cache capacity after evicting everything; admitted anyway"
            );
        }
        debug!(key = %key, size_bytes, total_size, entry_count, "Admitted buffer");
        admission
    }

    /// Return the cached buffer for `key`, or fetch, decode and admit it.
    ///
    /// Errors are returned to the caller as-is; nothing is retried here.
    /// Fails with [`CacheError::Disposed`] once the cache is disposed,
    /// including when disposal lands while the fetch is in flight.
    pub async fn fetch_and_decode(&self, key: &str) -> CacheResult<SharedBuffer> {
        if self.is_disposed() {
            return Err(CacheError::Disposed);
        }
        if let Some(buffer) = self.get(key) {
            return Ok(buffer);
        }

        let started = Instant::now();
        let bytes = self.inner.fetcher.fetch(key).await?;

        let decoder = Arc::clone(&self.inner.decoder);
        let buffer = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| CacheError::Decode(format!("decoder task failed: {e}")))?
            .map_err(|e| {
                warn!(key, error = %e, "Failed to decode audio");
                e
            })?;

        if self.is_disposed() {
            debug!(key, "Cache disposed during fetch; dropping decoded buffer");
            return Err(CacheError::Disposed);
        }
        let buffer = SharedBuffer::new(buffer);
        self.set(key, SharedBuffer::clone(&buffer));
        info!(
            key,
            size_bytes = buffer.size_bytes(),
            duration_secs = buffer.duration_secs(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched and decoded audio"
        );
        Ok(buffer)
    }

    /// Queue keys for best-effort background decoding.
    ///
    /// Keys already cached or queued are skipped; once the queue reaches its
    /// bound the remaining keys are dropped. Returns how many were queued.
    /// Outside an async runtime the keys stay queued until
    /// [`process_preload_queue`](Self::process_preload_queue) runs.
    pub fn preload<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if self.is_disposed() {
            return 0;
        }

        let mut enqueued = 0;
        let mut dropped = 0;
        {
            let store = self.inner.store.lock();
            let mut queue = self.inner.preload.lock();
            for key in keys {
                let key = key.into();
                if store.contains(&key) {
                    continue;
                }
                match queue.push(key) {
                    QueuePush::Enqueued => enqueued += 1,
                    QueuePush::Duplicate => {}
                    QueuePush::Full => dropped += 1,
                }
            }
        }

        if dropped > 0 {
            debug!(dropped, "Preload queue full; dropped newest requests");
        }
        if enqueued > 0 {
            self.spawn_preload_worker();
        }
        enqueued
    }

    fn spawn_preload_worker(&self) {
        if self.inner.preload_running.swap(true, Ordering::AcqRel) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let cache = self.clone();
                handle.spawn(async move { cache.drain_preload_queue().await });
            }
            Err(_) => {
                self.inner.preload_running.store(false, Ordering::Release);
                debug!("No async runtime; preload deferred");
            }
        }
    }

    /// Drain the preload queue on the current task. Returns immediately if a
    /// worker is already draining it.
    pub async fn process_preload_queue(&self) {
        if self.inner.preload_running.swap(true, Ordering::AcqRel) {
            return;
        }
        self.drain_preload_queue().await;
    }

    /// Serially fetch queued keys, one at a time with a pause in between.
    /// Must only run while holding the `preload_running` flag.
    async fn drain_preload_queue(&self) {
        let delay = self.inner.config.preload_delay();
        loop {
            if self.is_disposed() {
                self.inner.preload.lock().clear();
                self.inner.preload_running.store(false, Ordering::Release);
                return;
            }

            let next = self.inner.preload.lock().pop();
            let Some(key) = next else {
                self.inner.preload_running.store(false, Ordering::Release);
                // A key queued between the pop and the flag reset would
                // otherwise sit unprocessed.
                if self.inner.preload.lock().is_empty()
                    || self.inner.preload_running.swap(true, Ordering::AcqRel)
                {
                    return;
                }
                continue;
            };

            if self.has(&key) {
                continue;
            }

            match self.fetch_and_decode(&key).await {
                Ok(_) => debug!(key = %key, "Preloaded buffer"),
                Err(e) => warn!(key = %key, error = %e, "Preload failed; skipping"),
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Number of keys waiting for background decode.
    pub fn preload_queue_len(&self) -> usize {
        self.inner.preload.lock().len()
    }

    pub fn get_stats(&self) -> CacheStats {
        let (total_size, entry_count, oldest_entry_timestamp) = {
            let store = self.inner.store.lock();
            (store.total_size(), store.len(), store.oldest_access())
        };
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            total_size,
            entry_count,
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            hits,
            misses,
            oldest_entry_timestamp,
        }
    }

    /// Drop every entry and reset hit/miss counters. Preloads already past
    /// their admission check may still land afterwards.
    pub fn clear(&self) {
        self.inner.store.lock().clear();
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
        info!("Buffer cache cleared");
    }

    /// Remove one entry. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.store.lock().remove(key).is_some()
    }

    /// Remove all entries older than the configured maximum age.
    pub fn purge_expired(&self) -> usize {
        let Some(max_age) = self.inner.config.max_entry_age() else {
            return 0;
        };
        let purged = self
            .inner
            .store
            .lock()
            .purge_expired(SystemTime::now(), max_age);
        if !purged.is_empty() {
            info!(removed = purged.len(), "Purged expired cache entries");
        }
        purged.len()
    }

    /// Release every buffer and stop background preloading for good.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        self.inner.preload.lock().clear();
        self.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

/// Render-path lookups keep LRU order current but stay out of the
/// hit/miss statistics, which describe explicit `get` calls.
impl BufferLookup for BufferCache {
    fn lookup(&self, key: &str) -> Option<SharedBuffer> {
        self.touch_live(key)
    }
}

impl std::fmt::Debug for BufferCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferCache")
            .field("config", &self.inner.config)
            .field("stats", &self.get_stats())
            .finish()
    }
}
