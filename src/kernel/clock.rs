//! Clock — monotonic source of "now" in UTC, injected so tests can advance
//! it (spec §2.2).

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually-advanced clock for deterministic tests.
pub struct MockClock {
    millis: AtomicI64,
}

impl MockClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(time.timestamp_millis()),
        }
    }

    pub fn advance(&self, minutes: i64) {
        self.millis
            .fetch_add(minutes * 60_000, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .expect("mock clock millis always in range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_advances() {
        let start = Utc::now();
        let clock = MockClock::at(start);
        clock.advance(5);
        assert_eq!(clock.now(), start + chrono::Duration::minutes(5));
    }
}
