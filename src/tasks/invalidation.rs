//! Invalidation Consumer Task
//!
//! Background task that merges asynchronously delivered invalidation
//! events into the near cache store.

use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::NearCacheStore;
use crate::protocol::{Invalidation, InvalidationTarget};

/// Spawns a task consuming invalidation events into the store.
///
/// Events arrive on the network-callback delivery path and are applied
/// idempotently: invalidating an already-absent key is a no-op, not an
/// error. Events scoped to a different distributed object are ignored,
/// and a cache configured with `invalidate_on_change == false` drains the
/// channel without touching resident entries.
///
/// The task ends when the sender side of the channel is dropped.
pub fn spawn_invalidation_task<K>(
    store: Arc<NearCacheStore<K>>,
    mut events: mpsc::Receiver<Invalidation<K>>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let name = store.config().name().to_string();
        let apply = store.config().invalidate_on_change();
        info!(name = %name, apply, "starting invalidation consumer task");

        while let Some(event) = events.recv().await {
            if !apply {
                debug!(event_name = %event.name, "invalidate-on-change disabled, ignoring event");
                continue;
            }
            if event.name != name {
                debug!(event_name = %event.name, "ignoring invalidation for other object");
                continue;
            }
            match event.target {
                InvalidationTarget::Key(key) => {
                    let removed = store.invalidate(&key);
                    debug!(source = %event.source_member, removed, "applied key invalidation");
                }
                InvalidationTarget::All => {
                    store.invalidate_all();
                    debug!(source = %event.source_member, "applied full invalidation");
                }
            }
        }

        info!(name = %name, "invalidation delivery channel closed");
    })
}
