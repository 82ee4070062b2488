//! Settable clock.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// Start of every [`MockClock::new`]: 2025-01-01 00:00:00 UTC.
const EPOCH_SECS: i64 = 1_735_689_600;

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and pass
/// another into the component under test.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a clock fixed at 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn new() -> Self {
        Self::at(DateTime::<Utc>::from_timestamp(EPOCH_SECS, 0).unwrap_or_default())
    }

    /// Create a clock fixed at `time`.
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(time)),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Jump to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
