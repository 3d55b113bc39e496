//! Cache Module
//!
//! Bounded near cache storage with TTL/idle expiration, batch eviction and
//! atomic stats accounting.

mod entry;
mod eviction;
mod expiration;
mod stats;
mod store;


// Re-export public types
pub use entry::{NearCacheEntry, ENTRY_OVERHEAD_BYTES};
pub use eviction::{eviction_batch_size, select_victims, EvictionCandidate};
pub use expiration::SweepGate;
pub use stats::{NearCacheStats, StatsCounters};
pub use store::NearCacheStore;

// == Public Constants ==
/// Default cooldown between expiration sweeps; repeated sweep requests
/// within this window are coalesced into one actual scan.
pub const DEFAULT_SWEEP_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(1);
