use crate::RandSource;
use ::rand::{Rng, rng};

/// A `RandSource` backed by the thread-local RNG (`rand::rng()`).
///
/// The underlying generator is cryptographically secure (ChaCha-based) and
/// reseeds itself from the OS periodically. This type is zero-sized and does
/// not hold the RNG, so it is `Send + Sync` even though `ThreadRng` is not.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    #[inline]
    fn rand(&self) -> u64 {
        rng().random()
    }
}
