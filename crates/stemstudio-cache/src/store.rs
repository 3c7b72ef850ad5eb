//! Decoded buffer store with LRU capacity enforcement.
//!
//! Pure data: maps a source key to its decoded buffer plus access
//! bookkeeping, and evicts least-recently-used entries to make room for
//! admissions. All locking and I/O live in [`BufferCache`](crate::BufferCache).

use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use stemstudio_core::SharedBuffer;

/// Capacity bounds enforced at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_size_bytes: usize,
    pub max_entries: usize,
}

/// A decoded buffer held by the store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    buffer: SharedBuffer,
    size_bytes: usize,
    created_at: SystemTime,
    last_access_at: SystemTime,
    /// Monotonic access sequence; orders entries for LRU even when
    /// wall-clock timestamps collide.
    last_access_tick: u64,
    access_count: u64,
}

impl CacheEntry {
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Decoded size (`frames × channels × 4`), fixed at admission.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn last_access_at(&self) -> SystemTime {
        self.last_access_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    fn is_expired(&self, now: SystemTime, max_age: Duration) -> bool {
        now.duration_since(self.created_at)
            .map(|age| age > max_age)
            .unwrap_or(false)
    }
}

/// Outcome of admitting a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Keys evicted to make room, oldest first.
    pub evicted: Vec<String>,
    /// An entry with the same key was replaced.
    pub replaced: bool,
    /// The admitted buffer alone exceeds the size bound; it was kept after
    /// evicting everything else.
    pub over_capacity: bool,
}

/// Map from source key to decoded buffer.
#[derive(Debug, Default)]
pub struct DecodedBufferStore {
    entries: HashMap<String, CacheEntry>,
    total_size: usize,
    tick: u64,
}

impl DecodedBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed decoded size of all live entries.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Read an entry without touching its access statistics.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Record an access and return the buffer.
    pub fn touch(&mut self, key: &str, now: SystemTime) -> Option<SharedBuffer> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.last_access_at = now;
        entry.last_access_tick = tick;
        entry.access_count += 1;
        Some(SharedBuffer::clone(&entry.buffer))
    }

    /// Insert `buffer` under `key`, evicting least-recently-used entries until
    /// it fits. Re-admitting an existing key replaces it without double
    /// counting its size.
    pub fn admit(
        &mut self,
        key: String,
        buffer: SharedBuffer,
        limits: CacheLimits,
        now: SystemTime,
    ) -> Admission {
        let size_bytes = buffer.size_bytes();
        let replaced = self.remove(&key).is_some();
        let evicted = self.evict_for(size_bytes, limits);

        self.tick += 1;
        self.total_size += size_bytes;
        self.entries.insert(
            key,
            CacheEntry {
                buffer,
                size_bytes,
                created_at: now,
                last_access_at: now,
                last_access_tick: self.tick,
                access_count: 0,
            },
        );

        Admission {
            evicted,
            replaced,
            over_capacity: size_bytes > limits.max_size_bytes,
        }
    }

    /// Evict oldest-accessed entries until an entry of `incoming` bytes fits.
    fn evict_for(&mut self, incoming: usize, limits: CacheLimits) -> Vec<String> {
        let mut order: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access_tick, key.clone()))
            .collect();
        order.sort_unstable();

        let mut evicted = Vec::new();
        for (_, key) in order {
            if self.has_room(incoming, limits) {
                break;
            }
            self.remove(&key);
            evicted.push(key);
        }
        evicted
    }

    fn has_room(&self, incoming: usize, limits: CacheLimits) -> bool {
        self.total_size + incoming <= limits.max_size_bytes && self.entries.len() < limits.max_entries
    }

    /// Remove a single entry.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.total_size -= entry.size_bytes;
        Some(entry)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    /// Last-access time of the least recently used entry.
    pub fn oldest_access(&self) -> Option<SystemTime> {
        self.entries
            .values()
            .min_by_key(|entry| entry.last_access_tick)
            .map(|entry| entry.last_access_at)
    }

    pub fn is_expired(&self, key: &str, now: SystemTime, max_age: Duration) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now, max_age))
    }

    /// Remove every entry admitted more than `max_age` before `now`.
    pub fn purge_expired(&mut self, now: SystemTime, max_age: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, max_age))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
