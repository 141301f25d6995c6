//! Expiry Reaper Task
//!
//! Background task that periodically prunes expired cache entries from the
//! head of the expiry-ordered list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

// == Sweep Period ==
/// Lower bound on the sweep period, so short TTLs don't busy-wake the task.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(50);

/// Derives the reaper's sweep period from the cache TTL.
///
/// A quarter of the TTL keeps the memory held by unread, expired entries
/// bounded to a fraction of the working set, floored at [`MIN_SWEEP_PERIOD`]
/// to avoid needless wakeups.
pub fn sweep_period(expire_after: Duration) -> Duration {
    (expire_after / 4).max(MIN_SWEEP_PERIOD)
}

// == Reaper ==
/// Spawns the background task that sweeps expired entries.
///
/// The task loops between a fixed-period sleep and the one-shot shutdown
/// signal. Each wakeup acquires the exclusive lock and removes expired
/// nodes from the head of the expiry list, stopping at the first unexpired
/// one. The task terminates exactly once, when `shutdown` is notified; the
/// signal holds a permit, so a notification sent while the task is mid-sweep
/// is not lost.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `period` - Interval between sweeps
/// * `shutdown` - One-shot termination signal
///
/// # Returns
/// A JoinHandle for the spawned task.
pub fn spawn_reaper<T>(
    store: Arc<RwLock<CacheStore<T>>>,
    period: Duration,
    shutdown: Arc<Notify>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("Starting expiry reaper with sweep period of {:?}", period);

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = tokio::time::sleep(period) => {
                    let removed = store.write().sweep_expired(Instant::now());
                    if removed > 0 {
                        info!("Reaper: removed {} expired entries", removed);
                    } else {
                        debug!("Reaper: no expired entries found");
                    }
                }
            }
        }

        debug!("Expiry reaper terminated");
    })
}
