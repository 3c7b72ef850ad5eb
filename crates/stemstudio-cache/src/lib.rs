//! Stem Studio Cache - decoded audio buffer cache
//!
//! Resolves remote stems into decoded PCM and keeps them under a memory and
//! entry-count budget.
//!
//! Architecture:
//! - `DecodedBufferStore`: key → decoded buffer map with LRU capacity enforcement (no I/O)
//! - `PreloadQueue`: bounded, duplicate-free queue of keys awaiting background decode
//! - `BufferCache`: fetch + decode orchestration, hit/miss statistics, preload worker
//! - `Fetcher` / `AudioDecoder`: seams onto the network and the audio decoder

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod preload;
pub mod store;

pub use cache::{BufferCache, CacheStats};
pub use config::CacheConfig;
pub use decode::{AudioDecoder, SymphoniaDecoder};
pub use error::{CacheError, CacheResult};
pub use fetch::{FileFetcher, Fetcher, HttpFetcher, SchemeFetcher};
pub use preload::{PreloadQueue, QueuePush};
pub use store::{Admission, CacheEntry, CacheLimits, DecodedBufferStore};
