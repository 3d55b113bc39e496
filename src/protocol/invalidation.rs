//! Invalidation Event Module
//!
//! Events delivered out-of-band when backing map entries change anywhere
//! in the cluster. Each event names the distributed object, the affected
//! key (or all keys), and the member that produced it.

use uuid::Uuid;

// == Invalidation Target ==
/// What an invalidation event affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget<K> {
    /// One specific key changed.
    Key(K),
    /// Everything under the object may be stale (e.g. map clear).
    All,
}

// == Invalidation ==
/// A single invalidation event, consumed exactly once per delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation<K> {
    /// Distributed object name the event is scoped to
    pub name: String,
    /// Affected key, or all keys
    pub target: InvalidationTarget<K>,
    /// Id of the member that produced the event
    pub source_member: Uuid,
}

impl<K> Invalidation<K> {
    /// Creates a single-key invalidation.
    pub fn key(name: impl Into<String>, key: K, source_member: Uuid) -> Self {
        Self {
            name: name.into(),
            target: InvalidationTarget::Key(key),
            source_member,
        }
    }

    /// Creates a cache-wide invalidation.
    pub fn all(name: impl Into<String>, source_member: Uuid) -> Self {
        Self {
            name: name.into(),
            target: InvalidationTarget::All,
            source_member,
        }
    }
}
