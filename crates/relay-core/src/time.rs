//! Clock abstraction for testable timestamps.
//!
//! Production code uses [`SystemClock`]; tests inject [`ManualClock`] to
//! pin and advance time deterministically. All pipeline timestamps (event
//! publish time, status transitions, delivery log entries) flow through
//! this trait.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for deterministic tests.
///
/// Starts at the real current time unless pinned with [`ManualClock::set`].
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a manual clock starting at the real current time.
    pub fn new() -> Self {
        Self { now: RwLock::new(Utc::now()) }
    }

    /// Creates a manual clock pinned to a specific time.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(start) }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += delta;
    }

    /// Pins the clock to a specific time.
    pub fn set(&self, time: DateTime<Utc>) {
        let mut now = self.now.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now = time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
