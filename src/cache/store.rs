//! Cache Store Module
//!
//! Main near cache engine combining a sharded concurrent entry table with
//! batch eviction, TTL/idle expiration and atomic stats accounting.

use std::hash::Hash;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, NearCacheEntry};
use crate::cache::eviction::{eviction_batch_size, select_victims, EvictionCandidate};
use crate::cache::expiration::SweepGate;
use crate::cache::stats::{NearCacheStats, StatsCounters};
use crate::cache::DEFAULT_SWEEP_COOLDOWN;
use crate::config::{EvictionPolicy, NearCacheConfig};

// == Get Outcome ==
/// Result of the entry-table lookup, resolved outside the shard lock.
enum GetOutcome {
    Hit(Bytes),
    Missing,
    Expired,
}

// == Near Cache Store ==
/// Thread-safe near cache store.
///
/// The entry table is the single shared mutable resource; eviction,
/// expiration and stats all operate through it. Entry-level operations on
/// different keys proceed concurrently (sharded map); aggregate counters
/// are updated atomically per operation.
///
/// Sweeps race with concurrent puts by design: the actual size may
/// transiently exceed `max_size` until the next eviction pass runs. Tests
/// and callers poll until the post-sweep invariant holds rather than
/// asserting it instantaneously.
pub struct NearCacheStore<K> {
    /// Key-value entry table
    entries: DashMap<K, NearCacheEntry>,
    /// Atomic stats counters
    counters: StatsCounters,
    /// Cooldown gate for expiration sweeps
    sweep_gate: SweepGate,
    /// Immutable cache configuration
    config: NearCacheConfig,
}

// Hand-written so the impl carries no bounds on `K`; deriving would demand
// `K: Eq + Hash` from the entry table on top of `K: Debug`.
impl<K> std::fmt::Debug for NearCacheStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearCacheStore")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl<K> NearCacheStore<K>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new store with the default sweep cooldown.
    pub fn new(config: NearCacheConfig) -> Self {
        Self::with_sweep_cooldown(config, DEFAULT_SWEEP_COOLDOWN)
    }

    /// Creates a new store with an explicit sweep cooldown window.
    pub fn with_sweep_cooldown(config: NearCacheConfig, cooldown: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            counters: StatsCounters::new(),
            sweep_gate: SweepGate::new(cooldown),
            config,
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &NearCacheConfig {
        &self.config
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// On a hit the entry's recency/frequency metadata is refreshed. A
    /// lazily-detected expired entry is removed and counted as an
    /// expiration plus a miss. The caller is responsible for reading
    /// through to the backing map on a miss and calling [`put`].
    ///
    /// [`put`]: NearCacheStore::put
    pub fn get(&self, key: &K) -> Option<Bytes> {
        let now = current_timestamp_ms();
        let outcome = match self.entries.get_mut(key) {
            None => GetOutcome::Missing,
            Some(mut entry) => {
                if entry.is_expired(now, self.config.max_idle()) {
                    GetOutcome::Expired
                } else {
                    entry.touch();
                    GetOutcome::Hit(entry.value.clone())
                }
            }
        };

        let result = match outcome {
            GetOutcome::Hit(value) => {
                self.counters.record_hit();
                Some(value)
            }
            GetOutcome::Missing => {
                self.counters.record_miss();
                None
            }
            GetOutcome::Expired => {
                self.remove_if_expired(key, now);
                self.counters.record_miss();
                None
            }
        };

        // Reads opportunistically request a sweep; the cooldown gate turns
        // the request stream into at most one scan per window.
        self.try_sweep();
        result
    }

    // == Put ==
    /// Inserts or replaces an entry.
    ///
    /// Returns `false` when eviction is disabled and the cache is full: the
    /// entry is rejected rather than silently growing past `max_size`.
    /// When the insert pushes the table over capacity a batch eviction runs
    /// synchronously on the inserting thread.
    pub fn put(&self, key: K, value: Bytes) -> bool {
        if self.config.eviction_policy() == EvictionPolicy::None {
            return self.put_without_eviction(key, value);
        }

        let entry = NearCacheEntry::new(value, self.config.time_to_live());
        let new_cost = entry.memory_cost();
        match self.entries.insert(key, entry) {
            Some(old) => self.counters.record_replace(old.memory_cost(), new_cost),
            None => self.counters.record_insert(new_cost),
        }

        self.evict_if_over_capacity();
        self.try_sweep();
        true
    }

    /// Admission path with eviction disabled.
    ///
    /// The capacity check and the insert cannot be one atomic step on a
    /// sharded map, so a new key is admitted optimistically and rolled back
    /// if it pushed the table past `max_size`. Racing new-key puts at the
    /// boundary may therefore all be rejected; the bound itself is never
    /// left violated, and nothing ever heals a NONE-policy overage later.
    fn put_without_eviction(&self, key: K, value: Bytes) -> bool {
        if self.entries.len() >= self.config.max_size() && !self.entries.contains_key(&key) {
            return false;
        }

        let entry = NearCacheEntry::new(value, self.config.time_to_live());
        let new_cost = entry.memory_cost();
        match self.entries.insert(key.clone(), entry) {
            Some(old) => self.counters.record_replace(old.memory_cost(), new_cost),
            None => {
                self.counters.record_insert(new_cost);
                if self.entries.len() > self.config.max_size() {
                    if let Some((_, mine)) = self.entries.remove(&key) {
                        self.counters.record_remove(mine.memory_cost());
                    }
                    return false;
                }
            }
        }

        self.try_sweep();
        true
    }

    // == Invalidate ==
    /// Removes a single entry, e.g. on a remote invalidation event.
    ///
    /// Returns whether an entry was actually removed. Invalidation is not
    /// an eviction or expiration; neither counter is incremented.
    pub fn invalidate(&self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some((_, entry)) => {
                self.counters.record_remove(entry.memory_cost());
                true
            }
            None => false,
        }
    }

    /// Removes every entry, e.g. on subscription loss.
    ///
    /// Leaves `owned_entry_count == 0` and `owned_entry_memory_cost == 0`
    /// without retroactively altering historical hit/miss/eviction/
    /// expiration counters.
    pub fn invalidate_all(&self) {
        let keys: Vec<K> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut removed = 0usize;
        for key in &keys {
            if self.invalidate(key) {
                removed += 1;
            }
        }
        debug!(removed, "near cache invalidated");
    }

    // == Sweep ==
    /// Runs a cooldown-gated expiration sweep.
    ///
    /// Returns the number of entries expired, or 0 when the gate coalesced
    /// this request into an already-running window.
    pub fn try_sweep(&self) -> usize {
        let now = current_timestamp_ms();
        if !self.sweep_gate.try_acquire(now) {
            return 0;
        }
        self.sweep_expired(now)
    }

    fn sweep_expired(&self, now_ms: u64) -> usize {
        let max_idle = self.config.max_idle();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now_ms, max_idle))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0usize;
        for key in &expired {
            if self.remove_if_expired(key, now_ms) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "expiration sweep removed entries");
        }
        removed
    }

    /// Removes an entry iff it is still expired at `now_ms`.
    ///
    /// A concurrent path may have removed or replaced the entry between the
    /// scan and this call; finding nothing to do is success, not an error.
    fn remove_if_expired(&self, key: &K, now_ms: u64) -> bool {
        let max_idle = self.config.max_idle();
        match self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now_ms, max_idle))
        {
            Some((_, entry)) => {
                self.counters.record_remove(entry.memory_cost());
                self.counters.record_expiration();
                true
            }
            None => false,
        }
    }

    // == Eviction ==
    /// Runs one batch eviction pass if the table is over capacity.
    ///
    /// Returns the number of entries evicted.
    pub fn evict_if_over_capacity(&self) -> usize {
        if self.entries.len() <= self.config.max_size() {
            return 0;
        }

        let batch = eviction_batch_size(self.config.max_size());
        let candidates: Vec<EvictionCandidate<K>> = self
            .entries
            .iter()
            .map(|e| EvictionCandidate {
                key: e.key().clone(),
                last_access_ms: e.value().last_access_ms,
                access_count: e.value().access_count,
            })
            .collect();

        let victims = select_victims(self.config.eviction_policy(), candidates, batch);
        let mut evicted = 0usize;
        for key in victims {
            if let Some((_, entry)) = self.entries.remove(&key) {
                self.counters.record_remove(entry.memory_cost());
                self.counters.record_eviction();
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "eviction pass removed entries");
        }
        evicted
    }

    // == Size ==
    /// Returns the current number of resident entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    // == Stats ==
    /// Takes a non-blocking snapshot of the stats counters.
    pub fn stats(&self) -> NearCacheStats {
        self.counters.snapshot()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn config(max_size: usize) -> NearCacheConfig {
        NearCacheConfig::builder("test-map")
            .max_size(max_size)
            .build()
            .unwrap()
    }

    fn store(max_size: usize) -> NearCacheStore<u64> {
        NearCacheStore::with_sweep_cooldown(config(max_size), Duration::ZERO)
    }

    fn value(i: u64) -> Bytes {
        Bytes::from(format!("value-{}", i))
    }

    #[test]
    fn test_store_new_is_empty() {
        let store = store(100);
        assert_eq!(store.size(), 0);
        assert_eq!(store.stats().owned_entry_count, 0);
    }

    #[test]
    fn test_store_put_and_get() {
        let store = store(100);

        assert!(store.put(1, value(1)));
        assert_eq!(store.get(&1), Some(value(1)));
        assert_eq!(store.size(), 1);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.owned_entry_count, 1);
    }

    #[test]
    fn test_store_get_missing_counts_miss() {
        let store = store(100);

        assert_eq!(store.get(&42), None);
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_store_overwrite_keeps_single_entry() {
        let store = store(100);

        store.put(1, Bytes::from_static(b"first"));
        store.put(1, Bytes::from_static(b"second-longer"));

        assert_eq!(store.size(), 1);
        assert_eq!(store.get(&1), Some(Bytes::from_static(b"second-longer")));
        assert_eq!(store.stats().owned_entry_count, 1);
    }

    #[test]
    fn test_store_batch_eviction_on_overflow() {
        let max_size = 10;
        let store = store(max_size);

        // One entry past capacity triggers exactly one batch eviction.
        for i in 0..=(max_size as u64) {
            store.put(i, value(i));
        }

        let expected_evictions = eviction_batch_size(max_size) as u64;
        let stats = store.stats();
        assert_eq!(stats.evictions, expected_evictions);
        assert_eq!(
            stats.owned_entry_count,
            max_size as u64 + 1 - expected_evictions
        );
        assert_eq!(stats.expirations, 0);
        assert_eq!(store.size() as u64, stats.owned_entry_count);
    }

    #[test]
    fn test_store_lru_evicts_least_recently_used() {
        let max_size = 4;
        let store = store(max_size);
        for i in 0..max_size as u64 {
            store.put(i, value(i));
        }

        // Touch key 0 so it is the most recently used; the sleep keeps its
        // access timestamp strictly newer than the initial puts.
        sleep(Duration::from_millis(5));
        store.get(&0);
        store.put(99, value(99));

        // Batch is 4/5 + 1 = 1 victim; key 0 must survive.
        assert_eq!(store.stats().evictions, 1);
        assert!(store.get(&0).is_some());
    }

    #[test]
    fn test_store_debug_does_not_require_key_bounds() {
        // The Debug impl must not demand Eq + Hash + Debug from the key.
        #[derive(Clone, PartialEq, Eq, Hash)]
        struct Opaque;

        let config = config(10);
        let store: NearCacheStore<Opaque> = NearCacheStore::new(config);
        let rendered = format!("{:?}", store);
        assert!(rendered.contains("NearCacheStore"));
    }

    #[test]
    fn test_store_none_policy_bound_holds_under_concurrent_puts() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..100 {
            let config = NearCacheConfig::builder("test-map")
                .max_size(1)
                .eviction_policy(EvictionPolicy::None)
                .build()
                .unwrap();
            let store: Arc<NearCacheStore<u64>> =
                Arc::new(NearCacheStore::with_sweep_cooldown(config, Duration::ZERO));
            let barrier = Arc::new(Barrier::new(8));

            let mut handles = Vec::new();
            for i in 0..8u64 {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                handles.push(thread::spawn(move || {
                    barrier.wait();
                    store.put(i, value(i))
                }));
            }
            let admitted = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&ok| ok)
                .count();

            // Every admitted put left its (distinct) key resident, every
            // rejected one left nothing; the bound is never violated.
            assert!(store.size() <= 1, "NONE policy admitted {} entries", store.size());
            assert_eq!(admitted, store.size());
            assert_eq!(store.stats().owned_entry_count as usize, store.size());
        }
    }

    #[test]
    fn test_store_none_policy_rejects_when_full() {
        let config = NearCacheConfig::builder("test-map")
            .max_size(2)
            .eviction_policy(EvictionPolicy::None)
            .build()
            .unwrap();
        let store: NearCacheStore<u64> =
            NearCacheStore::with_sweep_cooldown(config, Duration::ZERO);

        assert!(store.put(1, value(1)));
        assert!(store.put(2, value(2)));
        // New key rejected at capacity.
        assert!(!store.put(3, value(3)));
        // Replacing a resident key is still allowed.
        assert!(store.put(2, Bytes::from_static(b"replacement")));

        assert_eq!(store.size(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_lazy_expiration_counts_expiration_not_eviction() {
        let config = NearCacheConfig::builder("test-map")
            .max_size(100)
            .time_to_live(Duration::from_millis(100))
            .build()
            .unwrap();
        let store: NearCacheStore<u64> =
            NearCacheStore::with_sweep_cooldown(config, Duration::from_secs(3600));

        store.put(1, value(1));
        sleep(Duration::from_millis(150));

        assert_eq!(store.get(&1), None);
        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.owned_entry_count, 0);
    }

    #[test]
    fn test_store_idle_expiration() {
        let config = NearCacheConfig::builder("test-map")
            .max_size(100)
            .max_idle(Duration::from_millis(100))
            .build()
            .unwrap();
        let store: NearCacheStore<u64> =
            NearCacheStore::with_sweep_cooldown(config, Duration::ZERO);

        store.put(1, value(1));
        sleep(Duration::from_millis(150));

        assert_eq!(store.get(&1), None);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_sweep_removes_all_expired() {
        let config = NearCacheConfig::builder("test-map")
            .max_size(100)
            .time_to_live(Duration::from_millis(100))
            .build()
            .unwrap();
        let store: NearCacheStore<u64> =
            NearCacheStore::with_sweep_cooldown(config, Duration::ZERO);

        for i in 0..10 {
            store.put(i, value(i));
        }
        sleep(Duration::from_millis(150));

        let removed = store.try_sweep();
        assert_eq!(removed, 10);

        let stats = store.stats();
        assert_eq!(stats.expirations, 10);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.owned_entry_count, 0);
    }

    #[test]
    fn test_store_sweep_is_cooldown_gated() {
        let config = NearCacheConfig::builder("test-map")
            .max_size(100)
            .time_to_live(Duration::from_millis(50))
            .build()
            .unwrap();
        let store: NearCacheStore<u64> =
            NearCacheStore::with_sweep_cooldown(config, Duration::from_secs(3600));

        store.put(1, value(1));
        sleep(Duration::from_millis(100));

        // The put's opportunistic sweep claimed the window; within the
        // cooldown the explicit request is coalesced away.
        assert_eq!(store.try_sweep(), 0);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_store_invalidate_does_not_count_eviction_or_expiration() {
        let store = store(100);
        store.put(1, value(1));

        assert!(store.invalidate(&1));
        assert!(!store.invalidate(&1));

        let stats = store.stats();
        assert_eq!(stats.owned_entry_count, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
    }

    #[test]
    fn test_store_invalidate_all_preserves_historical_counters() {
        let store = store(100);
        for i in 0..5 {
            store.put(i, value(i));
        }
        store.get(&0);
        store.get(&999);

        store.invalidate_all();

        let stats = store.stats();
        assert_eq!(stats.owned_entry_count, 0);
        assert_eq!(stats.owned_entry_memory_cost, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_store_memory_cost_round_trip() {
        let store = store(100);
        for i in 0..20 {
            store.put(i, value(i));
        }
        assert!(store.stats().owned_entry_memory_cost > 0);

        for i in 0..20 {
            store.invalidate(&i);
        }
        assert_eq!(store.stats().owned_entry_memory_cost, 0);
    }

    #[test]
    fn test_store_concurrent_population_converges() {
        use std::sync::Arc;
        use std::thread;

        let max_size = 100;
        let distinct_keys = 50u64;
        let store = Arc::new(store(max_size));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..distinct_keys {
                    store.put(i, value(i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Overlapping key ranges never double-count.
        let stats = store.stats();
        assert_eq!(stats.owned_entry_count, distinct_keys);
        assert_eq!(store.size() as u64, distinct_keys);
    }
}
