use core::{fmt, hash::Hash};

/// A primitive unsigned integer that packed ids are stored in.
///
/// Implemented for `u64` (63 usable bits, so the value stays positive when
/// read back as an `i64`) and `u128` (127 usable bits). Packing goes through
/// `u128` arithmetic so implementors only need lossless widening and a checked
/// narrowing conversion.
pub trait IdInt:
    Copy + Clone + Default + fmt::Debug + fmt::Display + Ord + Eq + Hash + Send + Sync + 'static
{
    /// Zero value.
    const ZERO: Self;

    /// Number of low bits that can be used without setting the sign bit of the
    /// signed integer of the same width.
    const CAPACITY: u32;

    /// Short name used in diagnostics.
    const NAME: &'static str;

    /// Widens this value to `u128`.
    fn to_u128(self) -> u128;

    /// Narrows a `u128`, returning `None` if it does not fit.
    fn try_from_u128(raw: u128) -> Option<Self>;
}

impl IdInt for u64 {
    const ZERO: Self = 0;
    const CAPACITY: u32 = 63;
    const NAME: &'static str = "u64";

    #[inline]
    fn to_u128(self) -> u128 {
        u128::from(self)
    }

    #[inline]
    fn try_from_u128(raw: u128) -> Option<Self> {
        Self::try_from(raw).ok()
    }
}

impl IdInt for u128 {
    const ZERO: Self = 0;
    const CAPACITY: u32 = 127;
    const NAME: &'static str = "u128";

    #[inline]
    fn to_u128(self) -> u128 {
        self
    }

    #[inline]
    fn try_from_u128(raw: u128) -> Option<Self> {
        Some(raw)
    }
}
