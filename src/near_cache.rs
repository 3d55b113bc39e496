//! Near Cache Facade Module
//!
//! Read-through front combining the local store with the backing map
//! collaborator. Reads hit local memory first; misses read through to the
//! backing map and populate the store.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::cache::{NearCacheStats, NearCacheStore};
use crate::error::Result;

// == Backing Map ==
/// Read contract to the authoritative remote key-value store.
///
/// Failures from this collaborator degrade to a cache miss at the facade,
/// never a crash.
pub trait BackingMap<K> {
    /// Loads the value for a key, or `None` if the backing map has no
    /// entry for it.
    fn load(&self, key: &K) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Returns whether the key's entry is owned by the local member.
    ///
    /// Used for the `cache_local_entries` decision; remote-only clients
    /// can leave the default.
    fn is_locally_owned(&self, key: &K) -> bool {
        let _ = key;
        false
    }
}

// == Near Cache ==
/// Client-side near cache for one distributed object.
#[derive(Debug)]
pub struct NearCache<K, B> {
    store: Arc<NearCacheStore<K>>,
    backing: B,
}

impl<K, B> NearCache<K, B>
where
    K: Eq + Hash + Clone,
    B: BackingMap<K>,
{
    /// Creates a near cache over the given store and backing map.
    pub fn new(store: Arc<NearCacheStore<K>>, backing: B) -> Self {
        Self { store, backing }
    }

    /// Returns the shared store, e.g. for wiring up background tasks.
    pub fn store(&self) -> &Arc<NearCacheStore<K>> {
        &self.store
    }

    // == Get ==
    /// Retrieves a value, reading through to the backing map on a miss.
    ///
    /// A backing map failure is logged and degrades to `None`: cache
    /// availability wins over strict consistency. Freshly loaded values
    /// populate the store unless the entry is locally owned and
    /// `cache_local_entries` is off, or the store rejected the entry
    /// (eviction disabled at capacity).
    pub async fn get(&self, key: &K) -> Option<Bytes> {
        if let Some(value) = self.store.get(key) {
            return Some(value);
        }

        let loaded = match self.backing.load(key).await {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(name = %self.store.config().name(), %err,
                    "backing map read failed, degrading to miss");
                return None;
            }
        };

        if let Some(value) = &loaded {
            if self.store.config().cache_local_entries() || !self.backing.is_locally_owned(key) {
                self.store.put(key.clone(), value.clone());
            }
        }
        loaded
    }

    // == Stats ==
    /// Takes a non-blocking stats snapshot.
    pub fn stats(&self) -> NearCacheStats {
        self.store.stats()
    }
}
