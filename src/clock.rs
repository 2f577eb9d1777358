//! Timestamp sources for call duration measurement
//!
//! Every tracer reads the clock once on entry and once on exit. The clock is a
//! trait object on the session so tests can drive time by hand with
//! [`ManualClock`] instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of monotonic timestamps in microseconds
pub trait ClockSource: Send + Sync {
    /// Current timestamp in microseconds
    fn now_us(&self) -> u64;
}

/// Wall-clock source backed by [`std::time::Instant`]
///
/// Timestamps are microseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock for deterministic tests
///
/// Unlike a real monotonic clock it can be moved backwards, which is how the
/// clock regression path of the tracer gets exercised.
///
/// # Example
///
/// ```
/// use calltrace::clock::{ClockSource, ManualClock};
///
/// let clock = ManualClock::new(100);
/// clock.advance(25);
/// assert_eq!(clock.now_us(), 125);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_us`
    pub const fn new(start_us: u64) -> Self {
        Self {
            now: AtomicU64::new(start_us),
        }
    }

    /// Set the current reading
    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    /// Move the reading forward by `delta_us`, returning the new value
    pub fn advance(&self, delta_us: u64) -> u64 {
        self.now.fetch_add(delta_us, Ordering::SeqCst) + delta_us
    }
}

impl ClockSource for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
