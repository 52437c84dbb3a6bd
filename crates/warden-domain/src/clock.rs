//! Clock module - the single source of "now" for a flush pass
//!
//! All artifact timestamps are persisted at second precision, so every clock
//! hands out instants rounded to the nearest whole second. A pass snapshots
//! `now` once and threads it through every step.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current instant, rounded to the nearest whole second
    fn now(&self) -> DateTime<Utc>;
}

/// Round an instant to the nearest whole second (half rounds up)
pub fn round_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    let mut secs = instant.timestamp();
    if instant.timestamp_subsec_nanos() >= 500_000_000 {
        secs += 1;
    }
    DateTime::from_timestamp(secs, 0).unwrap_or(instant)
}

/// Wall clock that never goes backwards
///
/// If the system clock steps back, the last observed second is returned
/// until wall time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    /// Create a new system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let observed = round_to_second(Utc::now());
        let secs = observed.timestamp();
        let previous = self.last.fetch_max(secs, Ordering::SeqCst);
        if previous > secs {
            DateTime::from_timestamp(previous, 0).unwrap_or(observed)
        } else {
            observed
        }
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug)]
pub struct MockClock {
    secs: AtomicI64,
}

impl MockClock {
    /// Create a clock frozen at `at` (rounded to the second)
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            secs: AtomicI64::new(round_to_second(at).timestamp()),
        }
    }

    /// Move the clock to `at`
    pub fn set(&self, at: DateTime<Utc>) {
        self.secs.store(round_to_second(at).timestamp(), Ordering::SeqCst);
    }

    /// Advance the clock by `delta` (whole seconds only)
    pub fn advance(&self, delta: TimeDelta) {
        self.secs.fetch_add(delta.num_seconds(), Ordering::SeqCst);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
