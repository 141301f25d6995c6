//! Cache Store Module
//!
//! Main cache engine combining HashMap lookup with the expiry-ordered list.
//!
//! The store itself is not synchronized; [`crate::cache::Cache`] wraps it in
//! a reader-writer lock and the reaper task sweeps it through the same lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::list::ExpiryList;
use crate::cache::stats::{CacheStats, StatsCounters};

// == Cache Store ==
/// Key-to-slot map plus expiry-ordered node list, sharing one TTL.
#[derive(Debug)]
pub(crate) struct CacheStore<T> {
    /// Key to slot-index map for O(1) lookup
    entries: HashMap<String, usize>,
    /// Nodes in non-decreasing expiry order
    order: ExpiryList<T>,
    /// Uniform TTL applied by every set
    expire_after: Duration,
    /// Hit/miss/expiration counters
    stats: StatsCounters,
}

impl<T> CacheStore<T> {
    // == Constructor ==
    /// Creates an empty store whose entries live for `expire_after`.
    pub fn new(expire_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: ExpiryList::new(),
            expire_after,
            stats: StatsCounters::default(),
        }
    }

    // == Set ==
    /// Stores a key-value pair with a fresh deadline.
    ///
    /// If the key already exists, the value and deadline are replaced in
    /// place and the node moves to the tail of the expiry list; otherwise a
    /// new tail node is created. Either way the touched entry carries the
    /// latest deadline in the cache, which keeps the list ordered.
    pub fn set(&mut self, key: String, value: T) {
        self.set_at(key, value, Instant::now());
    }

    /// Stores a key-value pair as of an explicit `now`.
    pub(crate) fn set_at(&mut self, key: String, value: T, now: Instant) {
        let expires_at = now + self.expire_after;
        match self.entries.get(&key) {
            Some(&idx) => self.order.refresh(idx, value, expires_at),
            None => {
                let idx = self.order.push_tail(key.clone(), value, expires_at);
                self.entries.insert(key, idx);
            }
        }
    }

    // == Sweep Expired ==
    /// Removes expired nodes from the head of the expiry list, stopping at
    /// the first unexpired node. Returns the number of entries removed.
    ///
    /// Cost is proportional to the number of expired nodes, never the size
    /// of the map, because the list is ordered by expiry.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(idx) = self.order.expired_head(now) {
            if let Some(key) = self.order.remove(idx) {
                self.entries.remove(&key);
            }
            removed += 1;
        }
        if removed > 0 {
            self.stats.record_expired(removed as u64);
        }
        removed
    }

    // == Clear ==
    /// Empties the map and the expiry list. The TTL is untouched.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.entries.len(), self.order.len());
        self.entries.len()
    }

    // == Stats ==
    /// Returns a snapshot of the performance counters.
    pub fn stats_snapshot(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }
}

impl<T: Clone> CacheStore<T> {
    // == Lookup ==
    /// Retrieves a copy of the value for `key`, or `None` if the key is
    /// absent or its deadline has passed.
    ///
    /// An expired entry is reported as a miss but never removed here: the
    /// read path runs under the shared lock and leaves eviction to the
    /// reaper.
    pub fn lookup(&self, key: &str) -> Option<T> {
        self.lookup_at(key, Instant::now())
    }

    /// Retrieves the value for `key` as of an explicit `now`.
    pub(crate) fn lookup_at(&self, key: &str, now: Instant) -> Option<T> {
        let value = self.entries.get(key).and_then(|&idx| {
            if self.order.is_expired(idx, now) {
                None
            } else {
                self.order.value(idx).cloned()
            }
        });
        match value {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }
}

// == Test Helpers ==
#[cfg(test)]
impl<T> CacheStore<T> {
    /// Asserts the structural invariants: the map and the list describe the
    /// same set of keys, and deadlines are non-decreasing from head to tail.
    pub(crate) fn check_invariants(&self) {
        let keys = self.order.keys_in_order();
        assert_eq!(keys.len(), self.entries.len(), "map/list size mismatch");
        for key in &keys {
            assert!(self.entries.contains_key(key), "list key missing from map");
        }
        let expiries = self.order.expiries_in_order();
        for pair in expiries.windows(2) {
            assert!(pair[0] <= pair[1], "expiries must be non-decreasing");
        }
    }
}
