use crate::{
    BitLayout, Degradation, IdInt, IdParts, RandSource, SystemClock, ThreadRandom, TimeSource,
    error::{Error, Result},
    generator::{
        GeneratorBuilder, IdGenStatus,
        state::{Rules, SequenceState, Stall, Step},
    },
    mutex::{Mutex, lock},
};
use core::{fmt, marker::PhantomData};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A thread-safe, trend-increasing id generator bound to one node identity.
///
/// The sequence state sits behind a mutex, so a single generator can be
/// shared across threads (for example in an [`Arc`]). Every id it returns is
/// strictly greater than the ids returned before it.
///
/// Generators are created with [`Generator::builder`] and register their
/// node with an [`InstanceRegistry`]; the configuration is fixed for the life
/// of the generator.
///
/// - `T` is the packed id type, `u64` or `u128`.
/// - `C` is the clock, [`SystemClock`] by default.
/// - `R` is the randomness used for reseeding, [`ThreadRandom`] by default.
///
/// [`Arc`]: std::sync::Arc
/// [`InstanceRegistry`]: crate::InstanceRegistry
pub struct Generator<T = u64, C = SystemClock, R = ThreadRandom>
where
    T: IdInt,
{
    pub(crate) state: Mutex<SequenceState>,
    pub(crate) rules: Rules,
    pub(crate) layout: BitLayout,
    pub(crate) node: u64,
    pub(crate) clock: C,
    pub(crate) rand: R,
    pub(crate) degradations: Vec<Degradation>,
    pub(crate) _id: PhantomData<fn() -> T>,
}

impl Generator {
    /// Starts configuring a generator for `layout`.
    ///
    /// The id type is picked when calling [`GeneratorBuilder::build`].
    pub fn builder(layout: BitLayout) -> GeneratorBuilder {
        GeneratorBuilder::new(layout)
    }
}

impl<T, C, R> Generator<T, C, R>
where
    T: IdInt,
    C: TimeSource,
    R: RandSource,
{
    /// Returns the next id, waiting inside the call when necessary.
    ///
    /// When every counter value of the current tick is used up, or the clock
    /// is behind the last issued tick by no more than the configured
    /// tolerance, the call busy-polls the clock until it may proceed. The
    /// wait is bounded by wall-clock time and cannot be cancelled; use
    /// [`Self::poll_id`] to stay in control.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock falls behind the last
    ///   issued tick by more than the tolerance. The generator is unchanged
    ///   and the call may be retried once the clock recovers.
    /// - [`Error::TimestampOverflow`] once the clock passes the last tick the
    ///   layout can represent.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<T> {
        let mut state = lock(&self.state)?;
        let mut regressed = false;
        loop {
            let now = self.current_tick();
            match state.step(now, &self.rules, &self.rand) {
                Ok(Step::Ready { tick, sequence }) => {
                    return Ok(self.layout.encode(tick, self.node, sequence));
                }
                Ok(Step::Wait { until, stall }) => {
                    if stall == Stall::Regressed && !regressed {
                        regressed = true;
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            last_tick = until,
                            now_tick = now,
                            "clock moved backwards, waiting for it to catch up"
                        );
                    }
                    core::hint::spin_loop();
                }
                Err(e) => return Err(self.report(e)),
            }
        }
    }

    /// Attempts to issue an id without waiting.
    ///
    /// Returns [`IdGenStatus::Pending`] with the tick to retry at when the
    /// current tick is exhausted or the clock is tolerably behind. The
    /// generator state is untouched in that case.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Result<IdGenStatus<T>> {
        let mut state = lock(&self.state)?;
        let now = self.current_tick();
        match state.step(now, &self.rules, &self.rand) {
            Ok(Step::Ready { tick, sequence }) => Ok(IdGenStatus::Ready {
                id: self.layout.encode(tick, self.node, sequence),
            }),
            Ok(Step::Wait { until, .. }) => Ok(IdGenStatus::Pending { yield_until: until }),
            Err(e) => Err(self.report(e)),
        }
    }

    /// Milliseconds from now until `tick` begins, zero if it already has.
    pub fn millis_until(&self, tick: u64) -> u64 {
        self.layout
            .millis_of(tick)
            .saturating_sub(self.clock.current_millis())
    }

    #[inline]
    fn current_tick(&self) -> u64 {
        self.layout.tick_of(self.clock.current_millis())
    }

    #[cold]
    fn report(&self, e: Error) -> Error {
        #[cfg(feature = "tracing")]
        if matches!(e, Error::ClockMovedBackwards { .. }) {
            tracing::error!(node = self.node, error = %e, "clock regression beyond tolerance");
        }
        e
    }
}

impl<T, C, R> Generator<T, C, R>
where
    T: IdInt,
{
    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    /// The node identity packed into every id.
    pub fn node(&self) -> u64 {
        self.node
    }

    /// Components of an automatically resolved node that fell back to
    /// randomness. Empty for explicit node identities.
    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    /// Splits an id produced with this generator's layout into its fields.
    pub fn decode(&self, id: T) -> IdParts {
        self.layout.decode(id)
    }

    /// Unix milliseconds at which the tick of `id` started.
    pub fn timestamp_millis(&self, id: T) -> u64 {
        self.layout.millis_of(self.decode(id).tick)
    }
}

impl<T, C, R> fmt::Debug for Generator<T, C, R>
where
    T: IdInt,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("id", &T::NAME)
            .field("layout", &self.layout)
            .field("node", &self.node)
            .field("reseed", &self.rules.reseed)
            .field("tolerance", &self.rules.tolerance)
            .finish_non_exhaustive()
    }
}
