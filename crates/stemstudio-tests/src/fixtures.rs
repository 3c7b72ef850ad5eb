//! Fakes for the fetch and decode seams.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stemstudio_cache::{AudioDecoder, BufferCache, CacheConfig, CacheError, CacheResult, Fetcher};
use stemstudio_core::{AudioBuffer, SharedBuffer};

/// In-memory "network". Unknown URLs answer 404; URLs mapped to `None`
/// time out.
#[derive(Default)]
pub struct FakeNetwork {
    responses: HashMap<String, Option<Vec<u8>>>,
    latency: Duration,
    pub requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl FakeNetwork {
    pub fn serve(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Some(bytes));
        self
    }

    pub fn time_out(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), None);
        self
    }

    /// Every request takes `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// When each request started, in arrival order.
    pub fn request_starts(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, url: &str) -> CacheResult<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(url) {
            Some(Some(bytes)) => Ok(bytes.clone()),
            Some(None) => Err(CacheError::Fetch {
                url: url.to_string(),
                status: None,
                message: "request timed out".into(),
            }),
            None => Err(CacheError::Fetch {
                url: url.to_string(),
                status: Some(404),
                message: "HTTP 404".into(),
            }),
        }
    }
}

pub const FAKE_RATE: u32 = 1000;

/// Every byte becomes one mono sample at 1 kHz; empty payloads are corrupt.
pub struct ByteDecoder;

impl AudioDecoder for ByteDecoder {
    fn decode(&self, bytes: &[u8]) -> CacheResult<AudioBuffer> {
        if bytes.is_empty() {
            return Err(CacheError::Decode("no audio frames".into()));
        }
        let samples = bytes.iter().map(|b| *b as f32 / 255.0).collect();
        AudioBuffer::from_samples(samples, FAKE_RATE, 1).map_err(|e| CacheError::Decode(e.to_string()))
    }
}

pub fn cache_with(config: CacheConfig, network: Arc<FakeNetwork>) -> BufferCache {
    BufferCache::new(config, network, Arc::new(ByteDecoder))
}

/// Buffer of exactly `bytes` decoded bytes.
pub fn buffer_of(bytes: usize) -> SharedBuffer {
    let samples = vec![0.0; bytes / 4];
    SharedBuffer::new(AudioBuffer::from_samples(samples, 8000, 1).unwrap())
}

/// One second of constant `level` at [`FAKE_RATE`].
pub fn tone(level: u8) -> Vec<u8> {
    vec![level; FAKE_RATE as usize]
}

/// Cache with no reachable network, for tests that admit buffers directly.
pub fn small_buffer_cache() -> BufferCache {
    cache_with(CacheConfig::default(), Arc::new(FakeNetwork::default()))
}
