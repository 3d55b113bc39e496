//! Cache Statistics Module
//!
//! Tracks near cache performance metrics: hits, misses, evictions,
//! expirations, and the owned entry count/memory cost.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Shared, lock-free counters updated with the same atomicity unit as the
/// store operation that caused them.
///
/// Snapshots taken via [`StatsCounters::snapshot`] may interleave with
/// concurrent operations but never show negative or count-skipped values.
#[derive(Debug, Default)]
pub struct StatsCounters {
    owned_entry_count: AtomicU64,
    owned_entry_memory_cost: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounters {
    /// Creates counters with everything at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry insert, adding its accounted memory cost.
    pub fn record_insert(&self, memory_cost: u64) {
        self.owned_entry_count.fetch_add(1, Ordering::Relaxed);
        self.owned_entry_memory_cost
            .fetch_add(memory_cost, Ordering::Relaxed);
    }

    /// Records an in-place replacement: the entry count is unchanged, the
    /// memory cost moves from the old entry's size to the new one's.
    pub fn record_replace(&self, old_cost: u64, new_cost: u64) {
        self.owned_entry_memory_cost
            .fetch_sub(old_cost, Ordering::Relaxed);
        self.owned_entry_memory_cost
            .fetch_add(new_cost, Ordering::Relaxed);
    }

    /// Records an entry removal, subtracting its accounted memory cost.
    pub fn record_remove(&self, memory_cost: u64) {
        self.owned_entry_count.fetch_sub(1, Ordering::Relaxed);
        self.owned_entry_memory_cost
            .fetch_sub(memory_cost, Ordering::Relaxed);
    }

    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the expiration counter.
    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current owned entry count.
    pub fn owned_entry_count(&self) -> u64 {
        self.owned_entry_count.load(Ordering::Relaxed)
    }

    // == Snapshot ==
    /// Takes a non-blocking snapshot of all counters.
    pub fn snapshot(&self) -> NearCacheStats {
        NearCacheStats {
            owned_entry_count: self.owned_entry_count.load(Ordering::Relaxed),
            owned_entry_memory_cost: self.owned_entry_memory_cost.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

// == Near Cache Stats ==
/// Read-only stats snapshot for monitoring and testing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NearCacheStats {
    /// Number of entries currently resident in the near cache
    pub owned_entry_count: u64,
    /// Approximate memory cost of all resident entries in bytes
    pub owned_entry_memory_cost: u64,
    /// Number of successful local retrievals
    pub hits: u64,
    /// Number of failed local retrievals (not found or expired)
    pub misses: u64,
    /// Number of entries removed by the eviction policy
    pub evictions: u64,
    /// Number of entries removed because a deadline passed
    pub expirations: u64,
}

impl NearCacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = StatsCounters::new().snapshot();
        assert_eq!(stats.owned_entry_count, 0);
        assert_eq!(stats.owned_entry_memory_cost, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
    }

    #[test]
    fn test_insert_and_remove_balance() {
        let counters = StatsCounters::new();

        counters.record_insert(100);
        counters.record_insert(50);
        let stats = counters.snapshot();
        assert_eq!(stats.owned_entry_count, 2);
        assert_eq!(stats.owned_entry_memory_cost, 150);

        counters.record_remove(100);
        counters.record_remove(50);
        let stats = counters.snapshot();
        assert_eq!(stats.owned_entry_count, 0);
        assert_eq!(stats.owned_entry_memory_cost, 0);
    }

    #[test]
    fn test_replace_moves_memory_cost() {
        let counters = StatsCounters::new();

        counters.record_insert(100);
        counters.record_replace(100, 30);

        let stats = counters.snapshot();
        assert_eq!(stats.owned_entry_count, 1);
        assert_eq!(stats.owned_entry_memory_cost, 30);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(NearCacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = StatsCounters::new();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_eviction_and_expiration_are_separate_counters() {
        let counters = StatsCounters::new();
        counters.record_eviction();
        counters.record_expiration();
        counters.record_expiration();

        let stats = counters.snapshot();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = StatsCounters::new().snapshot();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("owned_entry_count").is_some());
        assert!(json.get("owned_entry_memory_cost").is_some());
    }
}
