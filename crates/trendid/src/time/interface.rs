use core::time::Duration;
use std::sync::Arc;

/// Unix epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH: Duration = Duration::from_millis(0);

/// Monday, January 1, 2018 00:00:00 China Standard Time (UTC+8), the epoch of
/// the compact 42-bit layout.
pub const LEGACY_EPOCH: Duration = Duration::from_millis(1_514_736_000_000);

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// Generators convert these milliseconds into ticks using their
/// [`BitLayout`]. Implementations are free to move backwards (a real system
/// clock does after an NTP step); the generator detects and handles that.
///
/// # Example
///
/// ```
/// use trendid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
///
/// [`BitLayout`]: crate::BitLayout
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    #[inline]
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    #[inline]
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
