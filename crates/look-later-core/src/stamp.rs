use crate::clock::{Clock, SystemClock};
use std::sync::Mutex;

/// Issues capture timestamps that are unique within a process.
///
/// Timestamps are milliseconds since the Unix epoch and double as storage
/// keys, so two captures in the same millisecond (or a clock step backwards)
/// must not produce the same value. When the clock has not moved past the
/// last issued stamp, the stamp is `last + 1`.
pub struct MonotonicStamper<C: Clock = SystemClock> {
    clock: C,
    last: Mutex<Option<i64>>,
}

impl MonotonicStamper<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MonotonicStamper<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MonotonicStamper<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }

    /// Returns the next timestamp, strictly greater than any issued before.
    pub fn next_stamp(&self) -> i64 {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now().as_millisecond();
        let stamp = match *last {
            Some(previous) if now <= previous => previous + 1,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use jiff::Timestamp;

    fn clock_at(ms: i64) -> ManualClock {
        ManualClock::new(Timestamp::from_millisecond(ms).unwrap())
    }

    #[test]
    fn follows_clock_when_it_advances() {
        let clock = clock_at(1_000);
        let stamper = MonotonicStamper::with_clock(clock.clone());

        assert_eq!(stamper.next_stamp(), 1_000);
        clock.set(Timestamp::from_millisecond(5_000).unwrap());
        assert_eq!(stamper.next_stamp(), 5_000);
    }

    #[test]
    fn same_millisecond_is_bumped() {
        let stamper = MonotonicStamper::with_clock(clock_at(1_000));

        assert_eq!(stamper.next_stamp(), 1_000);
        assert_eq!(stamper.next_stamp(), 1_001);
        assert_eq!(stamper.next_stamp(), 1_002);
    }

    #[test]
    fn clock_moving_backward_never_repeats() {
        let clock = clock_at(2_000);
        let stamper = MonotonicStamper::with_clock(clock.clone());

        assert_eq!(stamper.next_stamp(), 2_000);
        clock.set(Timestamp::from_millisecond(1_500).unwrap());
        assert_eq!(stamper.next_stamp(), 2_001);
    }
}
