//! Error types for the near cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Near Cache Error Enum ==
/// Unified error type for the near cache and its registration protocol.
#[derive(Error, Debug)]
pub enum NearCacheError {
    /// Malformed or truncated payload during encode/decode.
    ///
    /// Unrecoverable for the request that produced it; the caller must
    /// treat the registration as failed.
    #[error("encoding fault: {0}")]
    EncodingFault(String),

    /// The permission capability rejected the request before dispatch.
    #[error("permission denied: listen on {0}")]
    PermissionDenied(String),

    /// The specific member addressed by the protocol cannot be reached
    /// or has left the cluster.
    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    /// The registration round trip exceeded the invocation timeout.
    #[error("invocation timed out after {0:?}")]
    InvocationTimeout(std::time::Duration),

    /// An unregister request was acknowledged as not-applied because no
    /// listener was registered under the given name.
    #[error("no listener registered for {0}")]
    NotRegistered(String),

    /// The backing map collaborator failed during a read-through.
    ///
    /// The facade degrades this to a cache miss; it is only surfaced to
    /// callers that talk to the backing map directly.
    #[error("backing map error: {0}")]
    BackingMap(String),

    /// Invalid configuration supplied to the builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the near cache.
pub type Result<T> = std::result::Result<T, NearCacheError>;
