//! Eviction Policy Module
//!
//! Selects batches of victims when the near cache is over capacity.

use rand::seq::SliceRandom;

use crate::config::EvictionPolicy;

// == Candidate ==
/// Per-entry metadata snapshot used for victim selection.
///
/// Candidates are collected outside the entry table's shard locks so that
/// selection never holds up concurrent reads and writes.
#[derive(Debug, Clone)]
pub struct EvictionCandidate<K> {
    /// The entry's key
    pub key: K,
    /// Last access timestamp (Unix milliseconds)
    pub last_access_ms: u64,
    /// Access count since creation
    pub access_count: u64,
}

// == Batch Size ==
/// Number of entries evicted in one pass: `floor(max_size * 0.2) + 1`.
///
/// Evicting a fixed fraction per pass amortizes eviction cost instead of
/// trimming one entry at a time on every over-capacity put.
pub fn eviction_batch_size(max_size: usize) -> usize {
    max_size / 5 + 1
}

// == Victim Selection ==
/// Picks up to `count` victims from the candidate snapshot according to
/// the configured policy.
///
/// Returns an empty vector for `EvictionPolicy::None`; the store rejects
/// over-capacity puts instead of evicting in that case.
pub fn select_victims<K>(
    policy: EvictionPolicy,
    mut candidates: Vec<EvictionCandidate<K>>,
    count: usize,
) -> Vec<K> {
    match policy {
        EvictionPolicy::Lru => {
            candidates.sort_by_key(|c| c.last_access_ms);
        }
        EvictionPolicy::Lfu => {
            candidates.sort_by_key(|c| (c.access_count, c.last_access_ms));
        }
        EvictionPolicy::Random => {
            candidates.shuffle(&mut rand::thread_rng());
        }
        EvictionPolicy::None => return Vec::new(),
    }

    candidates.truncate(count);
    candidates.into_iter().map(|c| c.key).collect()
}
