//! Near Cache - a client-side cache for a remote key-value store
//!
//! A bounded, locally-held mirror of a subset of entries from an
//! authoritative backing map, kept approximately fresh through an
//! out-of-band invalidation channel and governed by size/time-based
//! eviction so it never grows unbounded.

pub mod cache;
pub mod config;
pub mod error;
pub mod near_cache;
pub mod protocol;
pub mod tasks;

pub use cache::{NearCacheStats, NearCacheStore};
pub use config::{EvictionPolicy, NearCacheConfig};
pub use error::{NearCacheError, Result};
pub use near_cache::{BackingMap, NearCache};
pub use tasks::{spawn_invalidation_task, spawn_sweep_task};
