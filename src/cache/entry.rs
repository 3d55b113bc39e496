//! Cache Entry Module
//!
//! Defines the structure for individual near cache entries with TTL and
//! max-idle expiration support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// Approximate per-entry bookkeeping overhead in bytes, counted on top of
/// the value payload when computing the owned entry memory cost.
pub const ENTRY_OVERHEAD_BYTES: u64 = 48;

// == Near Cache Entry ==
/// A single near cache entry: opaque value payload plus access metadata.
///
/// Owned exclusively by the store; mutated only under the store's
/// synchronization discipline.
#[derive(Debug, Clone)]
pub struct NearCacheEntry {
    /// The cached value payload
    pub value: Bytes,
    /// Creation timestamp (Unix milliseconds)
    pub created_at_ms: u64,
    /// Last access timestamp (Unix milliseconds), refreshed on reads
    pub last_access_ms: u64,
    /// Number of accesses since creation (LFU frequency)
    pub access_count: u64,
    /// Absolute TTL deadline (Unix milliseconds), None = no TTL deadline
    pub expires_at_ms: Option<u64>,
}

impl NearCacheEntry {
    // == Constructor ==
    /// Creates a new entry with an optional time-to-live.
    ///
    /// A zero `time_to_live` means the entry carries no TTL deadline.
    /// The idle deadline is not stored; it slides with `last_access_ms`
    /// and is evaluated against the store's max-idle setting.
    pub fn new(value: Bytes, time_to_live: Duration) -> Self {
        let now = current_timestamp_ms();
        let expires_at_ms = if time_to_live.is_zero() {
            None
        } else {
            Some(now + time_to_live.as_millis() as u64)
        };

        Self {
            value,
            created_at_ms: now,
            last_access_ms: now,
            access_count: 0,
            expires_at_ms,
        }
    }

    // == Touch ==
    /// Records a successful read: refreshes recency and frequency metadata.
    ///
    /// The idle deadline slides on reads only; writes replace the entry and
    /// reset all metadata through [`NearCacheEntry::new`].
    pub fn touch(&mut self) {
        self.last_access_ms = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Is Expired ==
    /// Checks whether either deadline has passed.
    ///
    /// An entry is expired when `now >= created_at + ttl` (absolute) or
    /// `now >= last_access + max_idle` (sliding); a zero `max_idle`
    /// disables the idle deadline.
    pub fn is_expired(&self, now_ms: u64, max_idle: Duration) -> bool {
        if let Some(expires) = self.expires_at_ms {
            if now_ms >= expires {
                return true;
            }
        }
        if !max_idle.is_zero() {
            let idle_deadline = self.last_access_ms + max_idle.as_millis() as u64;
            if now_ms >= idle_deadline {
                return true;
            }
        }
        false
    }

    // == Memory Cost ==
    /// Approximate accounted size of this entry in bytes.
    pub fn memory_cost(&self) -> u64 {
        self.value.len() as u64 + ENTRY_OVERHEAD_BYTES
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = NearCacheEntry::new(Bytes::from_static(b"v"), Duration::ZERO);

        assert!(entry.expires_at_ms.is_none());
        assert_eq!(entry.access_count, 0);
        assert!(!entry.is_expired(current_timestamp_ms(), Duration::ZERO));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = NearCacheEntry::new(Bytes::from_static(b"v"), Duration::from_secs(60));

        assert!(entry.expires_at_ms.is_some());
        assert!(!entry.is_expired(current_timestamp_ms(), Duration::ZERO));
    }

    #[test]
    fn test_entry_ttl_expiration() {
        let entry = NearCacheEntry::new(Bytes::from_static(b"v"), Duration::from_millis(100));

        assert!(!entry.is_expired(current_timestamp_ms(), Duration::ZERO));
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired(current_timestamp_ms(), Duration::ZERO));
    }

    #[test]
    fn test_entry_idle_expiration() {
        let entry = NearCacheEntry::new(Bytes::from_static(b"v"), Duration::ZERO);

        sleep(Duration::from_millis(150));
        // No TTL deadline, but the idle deadline has passed.
        assert!(entry.is_expired(current_timestamp_ms(), Duration::from_millis(100)));
        assert!(!entry.is_expired(current_timestamp_ms(), Duration::from_secs(60)));
    }

    #[test]
    fn test_entry_touch_slides_idle_deadline() {
        let mut entry = NearCacheEntry::new(Bytes::from_static(b"v"), Duration::ZERO);

        sleep(Duration::from_millis(120));
        entry.touch();
        // Touch moved last_access_ms forward, so the idle deadline slid too.
        assert!(!entry.is_expired(current_timestamp_ms(), Duration::from_millis(100)));
        assert_eq!(entry.access_count, 1);
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let now = current_timestamp_ms();
        let entry = NearCacheEntry {
            value: Bytes::from_static(b"v"),
            created_at_ms: now,
            last_access_ms: now,
            access_count: 0,
            expires_at_ms: Some(now),
        };

        // Expired when current time >= the deadline.
        assert!(entry.is_expired(now, Duration::ZERO));
    }

    #[test]
    fn test_entry_memory_cost() {
        let entry = NearCacheEntry::new(Bytes::from_static(b"12345"), Duration::ZERO);
        assert_eq!(entry.memory_cost(), 5 + ENTRY_OVERHEAD_BYTES);
    }
}
