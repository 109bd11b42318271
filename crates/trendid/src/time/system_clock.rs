use crate::TimeSource;
use std::time::{Instant, SystemTime};

/// The operating system's wall clock.
///
/// This clock follows every adjustment made to the system time, including
/// backward steps. Generators built on it rely on their clock-regression
/// handling to stay monotonic.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    #[inline]
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0 and is treated as a regression.
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |since| since.as_millis() as u64)
    }
}

/// A wall clock that never moves backwards.
///
/// The wall-clock time is sampled once at construction; afterwards time
/// advances with the monotonic [`Instant`] timer. Later adjustments of the
/// system time (NTP steps, manual changes) are ignored, so long-running
/// processes may drift from true wall time.
///
/// # Example
///
/// ```
/// use trendid::{MonotonicClock, TimeSource};
///
/// let clock = MonotonicClock::new();
/// let a = clock.current_millis();
/// let b = clock.current_millis();
/// assert!(b >= a);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    anchor_millis: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            anchor_millis: SystemClock.current_millis(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    #[inline]
    fn current_millis(&self) -> u64 {
        self.anchor_millis + self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn system_clock_is_after_the_compact_epoch() {
        assert!(SystemClock.current_millis() > crate::LEGACY_EPOCH.as_millis() as u64);
    }

    #[test]
    fn monotonic_clock_tracks_elapsed_time() {
        let clock = MonotonicClock::new();
        let before = clock.current_millis();
        std::thread::sleep(Duration::from_millis(5));
        let after = clock.current_millis();
        assert!(after >= before + 4, "{before} -> {after}");
    }
}
