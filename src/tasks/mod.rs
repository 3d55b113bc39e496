//! Background Tasks Module
//!
//! Tokio tasks coordinating with the store only through its
//! synchronization boundary: the periodic sweep and the invalidation
//! event consumer.

mod invalidation;
mod sweep;

pub use invalidation::spawn_invalidation_task;
pub use sweep::spawn_sweep_task;
