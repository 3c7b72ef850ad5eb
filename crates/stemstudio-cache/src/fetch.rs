//! Network and file fetchers.
//!
//! The cache never retries or times out on its own; timeouts belong to the
//! fetch layer and retries to the caller.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Retrieves the raw bytes of an audio source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. Non-success statuses and transport failures are
    /// reported as [`CacheError::Fetch`].
    async fn fetch(&self, url: &str) -> CacheResult<Vec<u8>>;
}

/// HTTP(S) fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<Vec<u8>> {
        debug!(url, "Fetching audio");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::fetch(url, e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::fetch(
                url,
                Some(status.as_u16()),
                format!("HTTP {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::fetch(url, Some(status.as_u16()), e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Reads local files, accepting plain paths or `file://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<Vec<u8>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read(path)
            .await
            .map_err(|e| CacheError::fetch(url, None, e.to_string()))
    }
}

/// Dispatches `http://`/`https://` keys to HTTP and everything else to disk.
pub struct SchemeFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SchemeFetcher {
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(timeout)?,
            file: FileFetcher,
        })
    }
}

#[async_trait]
impl Fetcher for SchemeFetcher {
    async fn fetch(&self, url: &str) -> CacheResult<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url).await
        } else {
            self.file.fetch(url).await
        }
    }
}
