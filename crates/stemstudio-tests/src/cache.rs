//! Buffer cache behaviour across the fetch, decode and admission layers.

use crate::fixtures::{buffer_of, cache_with, tone, FakeNetwork};
use std::sync::Arc;
use std::time::Duration;
use stemstudio_cache::{CacheConfig, CacheError};

const KB: usize = 1024;

fn small_cache(max_size_bytes: usize, max_entries: usize) -> stemstudio_cache::BufferCache {
    cache_with(
        CacheConfig::with_limits(max_size_bytes, max_entries),
        Arc::new(FakeNetwork::default()),
    )
}

#[test]
fn bounds_hold_after_every_admission() {
    let cache = small_cache(64 * KB, 5);
    // Deterministic LCG so failures reproduce.
    let mut state: u64 = 0x2545_f491;
    for i in 0..500 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let key = format!("stem-{}", (state >> 33) % 12);
        let size = 4 * (1 + ((state >> 40) % (8 * KB as u64)) as usize);
        let admission = cache.set(key, buffer_of(size));

        let stats = cache.get_stats();
        assert!(!admission.over_capacity, "iteration {i}");
        assert!(stats.total_size <= 64 * KB, "iteration {i}: {}", stats.total_size);
        assert!(stats.entry_count <= 5, "iteration {i}: {}", stats.entry_count);
    }
}

#[test]
fn least_recently_used_is_evicted_first() {
    let cache = small_cache(usize::MAX, 3);
    for key in ["a", "b", "c"] {
        cache.set(key, buffer_of(16));
    }
    let admission = cache.set("d", buffer_of(16));
    assert_eq!(admission.evicted, vec!["a".to_string()]);
    assert!(!cache.has("a"));

    // Reading "b" makes "c" the oldest.
    assert!(cache.get("b").is_some());
    let admission = cache.set("e", buffer_of(16));
    assert_eq!(admission.evicted, vec!["c".to_string()]);
    assert!(cache.has("b") && cache.has("d") && cache.has("e"));
}

#[test]
fn size_bound_evicts_as_many_as_needed() {
    let cache = small_cache(100, 10);
    cache.set("a", buffer_of(40));
    cache.set("b", buffer_of(40));
    let admission = cache.set("c", buffer_of(80));
    assert_eq!(admission.evicted, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(cache.get_stats().total_size, 80);
}

#[test]
fn readmitting_a_key_replaces_without_double_counting() {
    let cache = small_cache(usize::MAX, 10);
    cache.set("a", buffer_of(400));
    let admission = cache.set("a", buffer_of(400));
    assert!(admission.replaced);
    assert!(admission.evicted.is_empty());

    let stats = cache.get_stats();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.total_size, 400);
}

#[test]
fn oversized_buffer_is_kept_alone() {
    let cache = small_cache(100, 10);
    cache.set("a", buffer_of(40));
    let admission = cache.set("huge", buffer_of(400));
    assert!(admission.over_capacity);
    assert_eq!(admission.evicted, vec!["a".to_string()]);
    assert_eq!(cache.get_stats().entry_count, 1);
}

#[test]
fn hit_rate_counts_every_lookup() {
    let cache = small_cache(usize::MAX, 10);
    assert_eq!(cache.get_stats().hit_rate, 0.0);

    cache.get("x");
    cache.get("y");
    cache.get("z");
    cache.set("x", buffer_of(8));
    cache.get("x");
    cache.get("x");

    let stats = cache.get_stats();
    assert_eq!((stats.hits, stats.misses), (2, 3));
    assert!((stats.hit_rate - 0.4).abs() < 1e-9);

    // `has` never counts.
    assert!(cache.has("x"));
    assert_eq!(cache.get_stats().hits, 2);
}

#[test]
fn preload_queue_stays_bounded_without_runtime() {
    let cache = small_cache(usize::MAX, 100);
    let first = cache.preload((0..25).map(|i| format!("https://cdn/{i}.mp3")));
    assert_eq!(first, 10);
    assert_eq!(cache.preload_queue_len(), 10);

    // Duplicates and overflow are both dropped.
    let again = cache.preload((0..25).map(|i| format!("https://cdn/{i}.mp3")));
    assert_eq!(again, 0);
    assert_eq!(cache.preload_queue_len(), 10);
}

#[tokio::test]
async fn fetch_and_decode_admits_once() {
    let network = Arc::new(FakeNetwork::default().serve("https://cdn/vocals.mp3", tone(128)));
    let cache = cache_with(CacheConfig::default(), Arc::clone(&network));

    let first = cache.fetch_and_decode("https://cdn/vocals.mp3").await.unwrap();
    let second = cache.fetch_and_decode("https://cdn/vocals.mp3").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(network.request_count(), 1);
    assert_eq!(first.duration_secs(), 1.0);

    let stats = cache.get_stats();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.total_size, first.size_bytes());
    assert!(stats.oldest_entry_timestamp.is_some());
}

#[tokio::test]
async fn network_and_format_failures_are_distinguished() {
    let network = Arc::new(
        FakeNetwork::default()
            .serve("https://cdn/empty.mp3", Vec::new())
            .time_out("https://cdn/slow.mp3"),
    );
    let cache = cache_with(CacheConfig::default(), network);

    let missing = cache.fetch_and_decode("https://cdn/missing.mp3").await.unwrap_err();
    assert!(matches!(missing, CacheError::Fetch { status: Some(404), .. }));
    assert!(missing.is_retryable());

    let slow = cache.fetch_and_decode("https://cdn/slow.mp3").await.unwrap_err();
    assert!(matches!(slow, CacheError::Fetch { status: None, .. }));

    let corrupt = cache.fetch_and_decode("https://cdn/empty.mp3").await.unwrap_err();
    assert!(matches!(corrupt, CacheError::Decode(_)));
    assert!(!corrupt.is_retryable());
    assert_ne!(slow.user_message(), corrupt.user_message());

    assert_eq!(cache.get_stats().entry_count, 0);
}

#[tokio::test]
async fn preload_worker_skips_failures() {
    let network = Arc::new(
        FakeNetwork::default()
            .serve("https://cdn/a.mp3", tone(10))
            .serve("https://cdn/c.mp3", tone(30)),
    );
    let config = CacheConfig {
        preload_delay_ms: 0,
        ..CacheConfig::default()
    };
    let cache = cache_with(config, Arc::clone(&network));

    let queued = cache.preload(["https://cdn/a.mp3", "https://cdn/b.mp3", "https://cdn/c.mp3"]);
    assert_eq!(queued, 3);
    // Either the spawned worker or this call drains the queue.
    cache.process_preload_queue().await;
    for _ in 0..200 {
        if cache.has("https://cdn/c.mp3") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert!(cache.has("https://cdn/a.mp3"));
    assert!(!cache.has("https://cdn/b.mp3"));
    assert!(cache.has("https://cdn/c.mp3"));
}

#[tokio::test]
async fn dispose_releases_everything() {
    let network = Arc::new(FakeNetwork::default().serve("https://cdn/a.mp3", tone(10)));
    let cache = cache_with(CacheConfig::default(), network);
    cache.fetch_and_decode("https://cdn/a.mp3").await.unwrap();

    cache.dispose();
    assert!(cache.is_disposed());
    assert_eq!(cache.get_stats().entry_count, 0);
    assert_eq!(cache.preload(["https://cdn/b.mp3"]), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn preload_fetches_one_at_a_time_with_a_pause() {
    let urls: Vec<String> = (0..4).map(|i| format!("https://cdn/{i}.mp3")).collect();
    let network = urls.iter().fold(
        FakeNetwork::default().with_latency(Duration::from_millis(20)),
        |net, url| net.serve(url, tone(5)),
    );
    let network = Arc::new(network);
    let config = CacheConfig {
        preload_delay_ms: 30,
        ..CacheConfig::default()
    };
    let cache = cache_with(config, Arc::clone(&network));

    assert_eq!(cache.preload(urls.clone()), 4);
    // A second drain request while the worker runs must not start another.
    cache.process_preload_queue().await;

    for _ in 0..200 {
        if urls.iter().all(|u| cache.has(u)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(urls.iter().all(|u| cache.has(u)));
    assert_eq!(network.request_count(), 4);
    assert_eq!(network.max_in_flight(), 1);

    // Each request waits for the previous one plus the preload pause.
    let starts = network.request_starts();
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(50), "gap was {gap:?}");
    }
}

#[tokio::test]
async fn disposed_cache_admits_nothing() {
    let network = Arc::new(FakeNetwork::default().serve("https://cdn/a.mp3", tone(10)));
    let cache = cache_with(CacheConfig::default(), Arc::clone(&network));
    cache.dispose();

    let admission = cache.set("direct", buffer_of(64));
    assert!(admission.evicted.is_empty());
    assert!(!cache.has("direct"));

    let err = cache.fetch_and_decode("https://cdn/a.mp3").await.unwrap_err();
    assert!(matches!(err, CacheError::Disposed));
    assert_eq!(network.request_count(), 0);
    assert_eq!(cache.get_stats().entry_count, 0);
}
