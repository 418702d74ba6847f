//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from a cache
//! group. Reads already treat expired entries as misses; this only releases
//! their memory budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheGroup;

/// Spawns a background task that periodically purges expired entries.
///
/// Returns the task handle so shutdown can abort it.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(state.group.clone(), 1);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(group: Arc<CacheGroup>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task for group '{}' with interval of {} seconds",
            group.name(),
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = group.purge_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
