//! Memo Cache - an in-process write-through TTL cache
//!
//! Memoizes the results of expensive external lookups (cloud metadata
//! fetches, key-set retrieval) behind a uniform per-cache TTL. Entries are
//! held in a key-to-node map plus an expiry-ordered list, and a background
//! reaper task prunes expired entries from the head of the list without
//! ever scanning the whole map.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use memo_cache::Cache;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: Cache<String> = Cache::new(Duration::from_secs(300));
//!
//! // Plain set/lookup.
//! cache.set("zone", "us-central1-a".to_string());
//! assert_eq!(cache.lookup("zone"), Some("us-central1-a".to_string()));
//!
//! // Memoized lookup: the closure only runs on a miss, and concurrent
//! // callers never recompute the same value twice.
//! let project = cache
//!     .write_thru_lookup("project", || Ok::<_, std::io::Error>("demo-project".to_string()))
//!     .unwrap();
//! assert_eq!(project, "demo-project");
//!
//! cache.stop();
//! # }
//! ```

pub mod cache;
mod tasks;

pub use cache::{Cache, CacheStats};
