use crate::{
    RandSource,
    error::{Error, Result},
};
use core::cmp::Ordering;

/// How the sequence is seeded at the start of every tick.
///
/// - `Zero` starts each tick at 0, so a tick yields all `2^counter_bits`
///   counter values.
/// - `Random` starts each tick at a random counter value. The low bits of the
///   ids are spread evenly, which suits stores that shard or hash-partition by
///   id, at the cost of fewer ids per tick: the counter only counts up from
///   the seed to its maximum before the generator waits for the next tick.
///
/// The counter never wraps within a tick, so ids of one generator are
/// strictly increasing under either strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReseedStrategy {
    Zero,
    #[default]
    Random,
}

/// The fixed parameters the state machine runs under.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Rules {
    pub(crate) max_tick: u64,
    pub(crate) counter_mask: u64,
    pub(crate) reseed: ReseedStrategy,
    pub(crate) tolerance: u64,
}

impl Rules {
    pub(crate) fn seed(&self, rand: &impl RandSource) -> u64 {
        match self.reseed {
            ReseedStrategy::Zero => 0,
            ReseedStrategy::Random => rand.rand() & self.counter_mask,
        }
    }
}

/// Why the state machine cannot issue an id for the sampled tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stall {
    /// Every counter value of the current tick has been issued.
    Exhausted,
    /// The clock is behind the last issued tick, within tolerance.
    Regressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Ready { tick: u64, sequence: u64 },
    /// Nothing changed; retry once the clock reaches `until`.
    Wait { until: u64, stall: Stall },
}

/// Per-generator mutable state: the last tick an id was issued in and where
/// the counter stands within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SequenceState {
    pub(crate) last_tick: u64,
    pub(crate) sequence: u64,
    /// `sequence` holds the seed of `last_tick` and has not been issued yet.
    /// Only true between construction and the first issued id.
    pub(crate) seed_pending: bool,
}

impl SequenceState {
    pub(crate) fn new(tick: u64, seed: u64) -> Self {
        Self {
            last_tick: tick,
            sequence: seed,
            seed_pending: true,
        }
    }

    /// Advances the state for a clock reading of `now`.
    ///
    /// The state is only modified when an id is issued: waiting and failing
    /// leave it exactly as it was.
    pub(crate) fn step(&mut self, now: u64, rules: &Rules, rand: &impl RandSource) -> Result<Step> {
        match now.cmp(&self.last_tick) {
            Ordering::Greater => {
                if now > rules.max_tick {
                    return Err(Error::TimestampOverflow {
                        tick: now,
                        max: rules.max_tick,
                    });
                }
                let seed = rules.seed(rand);
                *self = Self {
                    last_tick: now,
                    sequence: seed,
                    seed_pending: false,
                };
                Ok(Step::Ready {
                    tick: now,
                    sequence: seed,
                })
            }
            Ordering::Equal => {
                if self.seed_pending {
                    self.seed_pending = false;
                    return Ok(Step::Ready {
                        tick: now,
                        sequence: self.sequence,
                    });
                }
                if self.sequence >= rules.counter_mask {
                    return Ok(Step::Wait {
                        until: now.saturating_add(1),
                        stall: Stall::Exhausted,
                    });
                }
                let next = self.sequence + 1;
                self.sequence = next;
                Ok(Step::Ready {
                    tick: now,
                    sequence: next,
                })
            }
            Ordering::Less => Self::cold_clock_behind(now, self.last_tick, rules.tolerance),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_tick: u64, tolerance: u64) -> Result<Step> {
        if last_tick - now > tolerance {
            return Err(Error::ClockMovedBackwards {
                last_tick,
                now_tick: now,
                tolerance,
            });
        }
        Ok(Step::Wait {
            until: last_tick,
            stall: Stall::Regressed,
        })
    }
}
