//! Configuration Module
//!
//! Immutable near cache configuration, supplied once at cache creation.

use std::time::Duration;

use crate::error::{NearCacheError, Result};

// == Defaults ==
/// Default maximum number of entries in the near cache.
const DEFAULT_MAX_SIZE: usize = 10_000;
/// Default time-to-live (zero = entries never expire by age).
const DEFAULT_TIME_TO_LIVE: Duration = Duration::ZERO;
/// Default max idle time (zero = entries never expire by idleness).
const DEFAULT_MAX_IDLE: Duration = Duration::ZERO;

// == Eviction Policy ==
/// Eviction policy applied when the near cache exceeds its max size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least Recently Used - evicts entries with the oldest last access.
    #[default]
    Lru,
    /// Least Frequently Used - evicts entries with the lowest access count,
    /// ties broken by oldest last access.
    Lfu,
    /// Uniform random selection among current entries.
    Random,
    /// Eviction disabled; puts beyond capacity are rejected (not admitted),
    /// never silently grown past the limit.
    None,
}

// == Near Cache Config ==
/// Configuration for a near cache mirroring one distributed object.
///
/// Immutable after construction; build one via [`NearCacheConfig::builder`].
#[derive(Debug, Clone)]
pub struct NearCacheConfig {
    name: String,
    max_size: usize,
    eviction_policy: EvictionPolicy,
    time_to_live: Duration,
    max_idle: Duration,
    cache_local_entries: bool,
    invalidate_on_change: bool,
}

impl NearCacheConfig {
    /// Creates a new configuration builder for the named distributed object.
    pub fn builder(name: impl Into<String>) -> NearCacheConfigBuilder {
        NearCacheConfigBuilder::new(name)
    }

    /// Returns the distributed object name this near cache mirrors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the maximum number of entries the near cache may hold
    /// (outside the documented transient over-capacity window).
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the eviction policy used when the cache is over capacity.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction_policy
    }

    /// Returns the time-to-live for cached entries.
    ///
    /// `Duration::ZERO` means entries never expire based on age.
    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Returns the maximum idle time for cached entries.
    ///
    /// `Duration::ZERO` means entries never expire based on idleness.
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Returns whether entries owned by the local member are cached too.
    pub fn cache_local_entries(&self) -> bool {
        self.cache_local_entries
    }

    /// Returns whether remote changes invalidate near cache entries.
    pub fn invalidate_on_change(&self) -> bool {
        self.invalidate_on_change
    }
}

// == Builder ==
/// Builder for [`NearCacheConfig`].
#[derive(Debug, Clone)]
pub struct NearCacheConfigBuilder {
    name: String,
    max_size: Option<usize>,
    eviction_policy: Option<EvictionPolicy>,
    time_to_live: Option<Duration>,
    max_idle: Option<Duration>,
    cache_local_entries: Option<bool>,
    invalidate_on_change: Option<bool>,
}

impl NearCacheConfigBuilder {
    /// Creates a builder for the named distributed object.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_size: None,
            eviction_policy: None,
            time_to_live: None,
            max_idle: None,
            cache_local_entries: None,
            invalidate_on_change: None,
        }
    }

    /// Sets the maximum number of entries.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the eviction policy.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Sets the time-to-live for cached entries.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Sets the maximum idle time for cached entries.
    pub fn max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Sets whether locally-owned entries are cached too.
    pub fn cache_local_entries(mut self, cache: bool) -> Self {
        self.cache_local_entries = Some(cache);
        self
    }

    /// Sets whether remote changes invalidate near cache entries.
    pub fn invalidate_on_change(mut self, invalidate: bool) -> Self {
        self.invalidate_on_change = Some(invalidate);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// Returns `NearCacheError::InvalidConfig` if the name is empty or
    /// `max_size` is zero.
    pub fn build(self) -> Result<NearCacheConfig> {
        if self.name.is_empty() {
            return Err(NearCacheError::InvalidConfig(
                "near cache name must not be empty".to_string(),
            ));
        }

        let max_size = self.max_size.unwrap_or(DEFAULT_MAX_SIZE);
        if max_size == 0 {
            return Err(NearCacheError::InvalidConfig(
                "near cache max_size must be greater than zero".to_string(),
            ));
        }

        Ok(NearCacheConfig {
            name: self.name,
            max_size,
            eviction_policy: self.eviction_policy.unwrap_or_default(),
            time_to_live: self.time_to_live.unwrap_or(DEFAULT_TIME_TO_LIVE),
            max_idle: self.max_idle.unwrap_or(DEFAULT_MAX_IDLE),
            cache_local_entries: self.cache_local_entries.unwrap_or(false),
            invalidate_on_change: self.invalidate_on_change.unwrap_or(true),
        })
    }
}
