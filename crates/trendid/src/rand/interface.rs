use std::sync::Arc;

/// A source of random 64-bit values.
///
/// Generators draw from it when reseeding the sequence on a new tick, and the
/// node resolver draws from it when an environment probe fails. Tests plug in
/// fixed values to make both deterministic.
///
/// # Example
/// ```
/// use trendid::RandSource;
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn rand(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedRand.rand(), 1234);
/// ```
pub trait RandSource {
    /// Returns a uniformly distributed random value.
    fn rand(&self) -> u64;
}

impl<R: RandSource + ?Sized> RandSource for &R {
    #[inline]
    fn rand(&self) -> u64 {
        (**self).rand()
    }
}

impl<R: RandSource + ?Sized> RandSource for Arc<R> {
    #[inline]
    fn rand(&self) -> u64 {
        (**self).rand()
    }
}
