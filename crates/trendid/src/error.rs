/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `trendid` can emit.
///
/// Errors fall into two groups. Configuration errors are raised while a
/// generator is being built and mean no generator exists; retrying with the
/// same inputs will fail the same way. Runtime errors are raised by a single
/// `next_id` call and leave the generator untouched; of those only
/// [`Error::ClockMovedBackwards`] is worth retrying (see
/// [`Error::is_retryable`]).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The three fields together need more bits than the packed integer can
    /// hold without touching its sign bit.
    #[error("layout needs {total} bits but the id type only has {capacity} usable bits")]
    LayoutOverflow { total: u32, capacity: u32 },

    /// A single field is wider than 64 bits.
    #[error("{field} field is {bits} bits wide, the maximum is 64")]
    FieldTooWide { field: &'static str, bits: u8 },

    /// The layout is structurally unusable (e.g. no sequence bits).
    #[error("invalid layout: {reason}")]
    InvalidLayout { reason: &'static str },

    /// An explicitly supplied node, cluster or server value does not fit its
    /// bit width.
    #[error("{field} value {value} is out of range (max {max})")]
    ValueOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Another live generator in this process already uses the node identity.
    #[error("duplicate instance: node {node} is already registered")]
    DuplicateInstance { node: u64 },

    /// The wall clock is earlier than the layout's epoch.
    #[error("system clock ({now_millis} ms) is before the layout epoch ({epoch_millis} ms)")]
    EpochInFuture { now_millis: u64, epoch_millis: u64 },

    /// The clock moved backwards by more than the configured tolerance. No id
    /// was produced and the generator state is unchanged.
    #[error("clock moved backwards from tick {last_tick} to {now_tick} (tolerance {tolerance})")]
    ClockMovedBackwards {
        last_tick: u64,
        now_tick: u64,
        tolerance: u64,
    },

    /// The current tick no longer fits the timestamp field.
    #[error("tick {tick} exceeds the timestamp field maximum {max}")]
    TimestampOverflow { tick: u64, max: u64 },

    /// A radix-36 string could not be parsed into an id.
    #[error("invalid radix-36 id: {reason}")]
    InvalidRadix36 { reason: &'static str },

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// Only reachable with `std::sync::Mutex`; `parking_lot` mutexes do not
    /// poison.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Returns `true` when retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ClockMovedBackwards { .. })
    }

    /// Returns `true` for errors raised while building a generator.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::LayoutOverflow { .. }
                | Self::FieldTooWide { .. }
                | Self::InvalidLayout { .. }
                | Self::ValueOutOfRange { .. }
                | Self::DuplicateInstance { .. }
                | Self::EpochInFuture { .. }
        )
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
