//! Background Sweep Task
//!
//! Background task that periodically runs the expiration sweep and
//! re-checks capacity, so the store converges back under its max size
//! even without read traffic.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::NearCacheStore;

/// Spawns a background task that periodically sweeps the near cache.
///
/// Each pass requests a cooldown-gated expiration sweep and an eviction
/// pass if the store is over capacity. The sweep races with concurrent
/// population by design; this task is what closes the transient
/// over-capacity window.
///
/// Returns a JoinHandle which can be used to abort the task during
/// shutdown.
pub fn spawn_sweep_task<K>(
    store: Arc<NearCacheStore<K>>,
    sweep_interval: Duration,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = sweep_interval.as_millis() as u64,
            "starting near cache sweep task"
        );

        loop {
            tokio::time::sleep(sweep_interval).await;

            let expired = store.try_sweep();
            let evicted = store.evict_if_over_capacity();

            if expired > 0 || evicted > 0 {
                info!(expired, evicted, "sweep pass removed entries");
            } else {
                debug!("sweep pass: nothing to remove");
            }
        }
    })
}
