//! Integration Tests for the Cache
//!
//! Exercises the public surface end to end: TTL round-trips, write-through
//! memoization under contention, reaper pruning, and the stopped lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::anyhow;
use memo_cache::Cache;

// == Helper Functions ==

static INIT_TRACING: Once = Once::new();

/// Creates a string cache, installing the log subscriber once so test runs
/// honor RUST_LOG.
fn new_cache(ttl: Duration) -> Cache<String> {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
    Cache::new(ttl)
}

// == Set / Lookup Tests ==

#[tokio::test]
async fn test_set_then_lookup_roundtrip() {
    let cache = new_cache(Duration::from_secs(300));

    cache.set("key1", "value1".to_string());

    assert_eq!(cache.lookup("key1"), Some("value1".to_string()));
    assert_eq!(cache.size(), 1);
}

#[tokio::test]
async fn test_lookup_unknown_key_misses() {
    let cache = new_cache(Duration::from_secs(300));
    assert_eq!(cache.lookup("nonexistent"), None);
}

#[tokio::test]
async fn test_overwrite_replaces_value() {
    let cache = new_cache(Duration::from_secs(300));

    cache.set("key1", "value1".to_string());
    cache.set("key1", "value2".to_string());

    assert_eq!(cache.lookup("key1"), Some("value2".to_string()));
    assert_eq!(cache.size(), 1);
}

#[tokio::test]
async fn test_lookup_misses_after_ttl_elapses() {
    let cache = new_cache(Duration::from_millis(50));

    cache.set("foo", "bar".to_string());
    assert_eq!(cache.lookup("foo"), Some("bar".to_string()));

    tokio::time::sleep(Duration::from_millis(55)).await;

    assert_eq!(cache.lookup("foo"), None);
}

#[tokio::test]
async fn test_generic_value_types() {
    #[derive(Clone, Debug, PartialEq)]
    struct KeySet {
        keys: Vec<String>,
    }

    let cache: Cache<KeySet> = Cache::new(Duration::from_secs(300));
    let key_set = KeySet {
        keys: vec!["kid-1".to_string(), "kid-2".to_string()],
    };

    cache.set("jwks", key_set.clone());

    assert_eq!(cache.lookup("jwks"), Some(key_set));
}

// == Write-Through Lookup Tests ==

#[tokio::test]
async fn test_write_thru_lookup_memoizes() {
    let cache = new_cache(Duration::from_secs(300));
    let calls = AtomicUsize::new(0);

    let fetch = |value: &str| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, anyhow::Error>(value.to_string())
    };

    let first = cache.write_thru_lookup("meta", || fetch("fetched")).unwrap();
    let second = cache.write_thru_lookup("meta", || fetch("refetched")).unwrap();

    assert_eq!(first, "fetched");
    assert_eq!(second, "fetched", "second call must come from the cache");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_write_thru_lookup_prevents_stampede() {
    let cache: Arc<Cache<String>> = Arc::new(Cache::new(Duration::from_secs(300)));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(std::thread::spawn(move || {
            cache
                .write_thru_lookup("token", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Slow fetch: every other caller must block and then
                    // observe the cached result.
                    std::thread::sleep(Duration::from_millis(20));
                    Ok::<_, anyhow::Error>("secret".to_string())
                })
                .unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "secret");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1, "fetch must run exactly once");
}

#[tokio::test]
async fn test_write_thru_lookup_error_caches_nothing() {
    let cache = new_cache(Duration::from_secs(300));
    let calls = AtomicUsize::new(0);

    let result = cache.write_thru_lookup("meta", || -> anyhow::Result<String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("nope"))
    });

    assert_eq!(result.unwrap_err().to_string(), "nope");
    assert_eq!(cache.size(), 0);
    assert_eq!(cache.lookup("meta"), None);

    // The next call retries from scratch and can succeed.
    let value = cache
        .write_thru_lookup("meta", || -> anyhow::Result<String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("fetched".to_string())
        })
        .unwrap();

    assert_eq!(value, "fetched");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// == Size / Clear Tests ==

#[tokio::test]
async fn test_size_reflects_live_entries() {
    let cache = new_cache(Duration::from_secs(300));
    assert_eq!(cache.size(), 0);

    cache.set("key1", "value1".to_string());
    cache.set("key2", "value2".to_string());
    assert_eq!(cache.size(), 2);

    cache.clear();
    assert_eq!(cache.size(), 0);

    cache.set("key3", "value3".to_string());
    assert_eq!(cache.size(), 1);
}

#[tokio::test]
async fn test_clear_preserves_ttl_behavior() {
    let cache = new_cache(Duration::from_secs(300));

    cache.set("key1", "value1".to_string());
    cache.clear();
    cache.set("key2", "value2".to_string());

    assert_eq!(cache.lookup("key2"), Some("value2".to_string()));
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let cache = new_cache(Duration::from_secs(300));

    cache.set("key1", "value1".to_string());
    cache.lookup("key1");
    cache.lookup("nonexistent");

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

// == Reaper Tests ==

#[tokio::test]
async fn test_reaper_prunes_without_reads() {
    // 100ms TTL floors the sweep period at 50ms
    let cache = new_cache(Duration::from_millis(100));

    cache.set("key1", "value1".to_string());
    cache.set("key2", "value2".to_string());
    assert_eq!(cache.size(), 2);

    // No lookups happen here; only the reaper can remove the entries.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(cache.size(), 0);
}

// == Lifecycle Tests ==

#[tokio::test]
async fn test_stop_twice_is_noop() {
    let cache = new_cache(Duration::from_secs(300));
    cache.set("key1", "value1".to_string());

    cache.stop();
    cache.stop();
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_lookup_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    cache.lookup("key1");
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_set_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    cache.set("key1", "value1".to_string());
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_size_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    cache.size();
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_clear_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    cache.clear();
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_stats_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    cache.stats();
}

#[tokio::test]
#[should_panic(expected = "cache is stopped")]
async fn test_write_thru_lookup_after_stop_panics() {
    let cache = new_cache(Duration::from_secs(300));
    cache.stop();
    let _ = cache.write_thru_lookup("key1", || Ok::<_, anyhow::Error>("value".to_string()));
}
