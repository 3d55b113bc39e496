//! Expiration Sweep Gate Module
//!
//! Cooldown gate coalescing repeated sweep requests into one actual scan,
//! to avoid cleanup thrash under high read volume.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// == Sweep Gate ==
/// Gate that admits at most one sweep per cooldown window.
///
/// Every store operation may request a sweep opportunistically; the gate
/// turns those requests into at most one scan per window, and the losing
/// threads simply carry on.
#[derive(Debug)]
pub struct SweepGate {
    cooldown_ms: u64,
    last_sweep_ms: AtomicU64,
}

impl SweepGate {
    /// Creates a gate with the given cooldown window.
    ///
    /// The gate starts open: the first request is always admitted.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: cooldown.as_millis() as u64,
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    // == Try Acquire ==
    /// Attempts to claim the current sweep window.
    ///
    /// Returns `true` for exactly one caller per window; all other callers
    /// within the cooldown get `false` and skip their scan.
    pub fn try_acquire(&self, now_ms: u64) -> bool {
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms < last + self.cooldown_ms {
            return false;
        }
        self.last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}
