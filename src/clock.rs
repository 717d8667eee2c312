//! Time source for store-managed timestamps.

use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::sync::RwLock;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to the microsecond precision of `TIMESTAMPTZ`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Clock that reports a fixed instant until moved with [`FixedClock::set`].
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: RwLock::new(instant.trunc_subsecs(6)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.write().unwrap_or_else(|e| e.into_inner());
        *guard = instant.trunc_subsecs(6);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_fixed_clock() {
        let t1 = Utc.with_ymd_and_hms(2021, 11, 11, 11, 11, 11).unwrap();
        let clock = FixedClock::new(t1);
        assert_eq!(clock.now(), t1);
        assert_eq!(clock.now(), clock.now());

        let t2 = Utc.with_ymd_and_hms(2021, 11, 11, 11, 11, 22).unwrap();
        clock.set(t2);
        assert_eq!(clock.now(), t2);
    }

    #[test]
    fn test_sub_microsecond_precision_dropped() {
        let t = Utc.with_ymd_and_hms(2021, 11, 11, 11, 11, 11).unwrap()
            + chrono::Duration::nanoseconds(111_000_123);
        let clock = FixedClock::new(t);
        assert_eq!(clock.now().nanosecond(), 111_000_000);
        assert_eq!(SystemClock.now().nanosecond() % 1_000, 0);
    }
}
