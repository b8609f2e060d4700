//! Time utilities for the records registry.
//!
//! All timestamps are Unix epoch microseconds (u64). The ledger never
//! reads the system time directly; it asks a [`Clock`] handed to it by
//! the caller, so tests can drive time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current time for ledger writes.
pub trait Clock: Send + Sync {
    /// Current time in microseconds since the Unix epoch.
    fn now_micros(&self) -> u64;
}

/// Wall-clock time from the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        now_micros()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `micros`.
    pub fn new(micros: u64) -> Self {
        Self {
            micros: AtomicU64::new(micros),
        }
    }

    /// Move the clock forward by `micros`.
    pub fn advance(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    /// Set the clock to an absolute value, which may be in the past.
    pub fn set(&self, micros: u64) {
        self.micros.store(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::SeqCst)
    }
}

/// Return the current time as microseconds since Unix epoch.
///
/// A host clock set before 1970 reads as zero.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Convert microseconds to an RFC 3339 string.
pub fn micros_to_rfc3339(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    let nsecs = ((micros % 1_000_000) * 1000) as u32;
    chrono::DateTime::from_timestamp(secs, nsecs)
        .unwrap_or_default()
        .to_rfc3339()
}
