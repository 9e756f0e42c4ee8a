//! Time sources used to judge token expiry
//!
//! Token validity is always evaluated against a [`Clock`] so that tests can
//! move time forward without sleeping.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

pub use aliri_clock::{Clock, System, UnixTime};

/// Whole-second arithmetic on [`UnixTime`] that saturates instead of
/// overflowing
pub trait UnixTimeExt {
    /// The time `offset` after this one
    fn saturating_add(self, offset: Duration) -> Self;
    /// The time `offset` before this one, or the epoch
    fn saturating_sub(self, offset: Duration) -> Self;
    /// The time elapsed since `earlier`, or zero if `earlier` is later
    fn saturating_duration_since(self, earlier: Self) -> Duration;
}

impl UnixTimeExt for UnixTime {
    #[inline]
    fn saturating_add(self, offset: Duration) -> Self {
        UnixTime(self.0.saturating_add(offset.as_secs()))
    }

    #[inline]
    fn saturating_sub(self, offset: Duration) -> Self {
        UnixTime(self.0.saturating_sub(offset.as_secs()))
    }

    #[inline]
    fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_secs(self.0.saturating_sub(earlier.0))
    }
}

/// A test clock which maintains the current time as shared internal state
///
/// Unlike [`aliri_clock::TestClock`], clones observe the same time, so a
/// clock handed to a token source can still be advanced from the test body.
#[derive(Clone, Debug, Default)]
pub struct TestClock(Arc<AtomicU64>);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime(self.0.load(Ordering::Acquire))
    }
}

impl TestClock {
    /// Creates a new test clock with the specified time
    pub fn new(time: UnixTime) -> Self {
        Self(Arc::new(AtomicU64::new(time.0)))
    }

    /// Updates the clock's current time to `val`
    pub fn set(&self, val: UnixTime) {
        self.0.store(val.0, Ordering::Release);
    }

    /// Moves the clock's current time forward by `inc`
    pub fn advance(&self, inc: Duration) {
        self.0.fetch_add(inc.as_secs(), Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_clones_share_time() {
        let clock = TestClock::new(UnixTime(100));
        let observer = clock.clone();

        clock.advance(Duration::from_secs(20));
        assert_eq!(observer.now(), UnixTime(120));

        observer.set(UnixTime(5));
        assert_eq!(clock.now(), UnixTime(5));
    }

    #[test]
    fn arithmetic_saturates() {
        let ten = UnixTime(10);
        assert_eq!(ten.saturating_duration_since(UnixTime(30)), Duration::ZERO);
        assert_eq!(ten.saturating_sub(Duration::from_secs(30)), UnixTime(0));
        assert_eq!(
            UnixTime(30).saturating_duration_since(ten),
            Duration::from_secs(20)
        );
        assert_eq!(
            UnixTime(u64::MAX).saturating_add(Duration::from_secs(1)),
            UnixTime(u64::MAX)
        );
    }
}
