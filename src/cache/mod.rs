//! Cache Module
//!
//! Generic in-process write-through cache with a uniform TTL.
//!
//! Four parts: a key-to-node map for O(1) lookup, a doubly linked list of
//! nodes kept in non-decreasing expiry order, a background reaper that
//! prunes expired nodes from the head of that list, and a one-way
//! running-to-stopped lifecycle. Because every write stamps the same TTL
//! and relinks the touched node at the tail, insertion order equals
//! expiration order and the reaper never scans the whole map.

mod entry;
mod list;
mod stats;
mod store;


pub use stats::CacheStats;
pub(crate) use store::CacheStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::tasks::{spawn_reaper, sweep_period};

// == Cache ==
/// Thread-safe write-through cache holding values of type `T` for a fixed
/// duration.
///
/// Every operation takes `&self`; share the cache across threads or tasks
/// behind an [`Arc`]. Readers ([`Cache::lookup`], [`Cache::size`],
/// [`Cache::stats`]) take the shared lock; all mutators take the exclusive
/// lock.
///
/// A cache that is no longer needed should be shut down with
/// [`Cache::stop`]; afterwards every other operation panics. Dropping the
/// cache aborts the reaper task so an un-stopped cache does not leak it.
pub struct Cache<T> {
    /// Shared store; the reaper holds its own reference
    store: Arc<RwLock<CacheStore<T>>>,
    /// One-way running-to-stopped flag
    stopped: AtomicBool,
    /// One-shot shutdown signal for the reaper
    shutdown: Arc<Notify>,
    /// Handle for the reaper task
    reaper: JoinHandle<()>,
    /// Uniform TTL applied by every set
    expire_after: Duration,
}

impl<T> Cache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose entries live for `expire_after` and starts the
    /// background reaper, which sweeps every `max(expire_after / 4, 50ms)`.
    ///
    /// Must be called within a tokio runtime; the reaper is a tokio task.
    ///
    /// # Panics
    /// Panics if `expire_after` is zero. A zero TTL is a caller bug, not a
    /// runtime condition.
    pub fn new(expire_after: Duration) -> Self {
        assert!(
            expire_after > Duration::ZERO,
            "cache expiry must be a positive duration"
        );

        let store = Arc::new(RwLock::new(CacheStore::new(expire_after)));
        let shutdown = Arc::new(Notify::new());
        let reaper = spawn_reaper(
            Arc::clone(&store),
            sweep_period(expire_after),
            Arc::clone(&shutdown),
        );

        Self {
            store,
            stopped: AtomicBool::new(false),
            shutdown,
            reaper,
            expire_after,
        }
    }

    // == Lookup ==
    /// Returns a copy of the cached value for `key`, or `None` if the key
    /// is absent or expired.
    ///
    /// Expired entries are reported as misses but never evicted here; the
    /// read path holds only the shared lock, and eviction belongs to the
    /// reaper.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    pub fn lookup(&self, key: &str) -> Option<T> {
        let store = self.store.read();
        self.check_running();
        store.lookup(key)
    }

    // == Set ==
    /// Stores `value` under `key` with a fresh deadline, creating the entry
    /// or replacing an existing one in place.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    pub fn set(&self, key: impl Into<String>, value: T) {
        let mut store = self.store.write();
        self.check_running();
        store.set(key.into(), value);
    }

    // == Write-Through Lookup ==
    /// Returns the cached value for `key`, or computes, caches, and returns
    /// it by calling `lookup`.
    ///
    /// The whole check-compute-store sequence runs under the cache's
    /// exclusive lock, so concurrent callers serialize and `lookup` runs at
    /// most once per miss, cache-wide: no stampede of duplicate
    /// recomputation. The cost is that every other operation waits while a
    /// `lookup` is in flight, which suits infrequent, expensive, cold-path
    /// fetches.
    ///
    /// On failure nothing is cached and the error is returned unchanged, so
    /// the very next call retries.
    ///
    /// `lookup` must not touch this cache, or it will deadlock against its
    /// own lock.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    ///
    /// # Example
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use std::time::Duration;
    /// use memo_cache::Cache;
    ///
    /// let cache: Cache<String> = Cache::new(Duration::from_secs(300));
    /// let zone = cache
    ///     .write_thru_lookup("instance/zone", || {
    ///         // ... an expensive metadata fetch ...
    ///         Ok::<_, std::io::Error>("us-central1-a".to_string())
    ///     })
    ///     .unwrap();
    /// assert_eq!(zone, "us-central1-a");
    /// # cache.stop();
    /// # }
    /// ```
    pub fn write_thru_lookup<F, E>(&self, key: &str, lookup: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut store = self.store.write();
        self.check_running();

        if let Some(value) = store.lookup(key) {
            return Ok(value);
        }

        let value = lookup()?;
        store.set(key.to_string(), value.clone());
        Ok(value)
    }

    // == Size ==
    /// Returns the number of live entries.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    pub fn size(&self) -> usize {
        let store = self.store.read();
        self.check_running();
        store.len()
    }

    // == Clear ==
    /// Removes every entry. The TTL and the reaper's schedule are untouched.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    pub fn clear(&self) {
        let mut store = self.store.write();
        self.check_running();
        store.clear();
        debug!("Cache cleared");
    }

    // == Stats ==
    /// Returns a snapshot of the hit/miss/expiration counters.
    ///
    /// # Panics
    /// Panics if the cache has been stopped.
    pub fn stats(&self) -> CacheStats {
        let store = self.store.read();
        self.check_running();
        store.stats_snapshot()
    }

    // == Expire After ==
    /// The TTL every entry is stored with.
    pub fn expire_after(&self) -> Duration {
        self.expire_after
    }

    // == Stop ==
    /// Shuts the cache down: terminates the reaper and drops all data.
    ///
    /// The transition is one-way and happens exactly once; later calls are
    /// silent no-ops. Every other operation panics after this, by design: a
    /// stopped cache must never silently degrade into a no-op cache, since
    /// continued use signals a lifecycle bug in the caller.
    pub fn stop(&self) {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.shutdown.notify_one();
        self.store.write().clear();
        debug!("Cache stopped");
    }

    // == Running Check ==
    /// Panics if the cache has been stopped.
    ///
    /// Called with the lock held: `stop` raises the flag before it takes
    /// the exclusive lock to clear, so an operation that gets the lock
    /// after the clear always observes the flag and can never repopulate a
    /// stopped cache.
    fn check_running(&self) {
        if self.stopped.load(Ordering::Acquire) {
            panic!("cache is stopped");
        }
    }
}

impl<T> Drop for Cache<T> {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}
