use crate::{
    error::{Error, Result},
    id::IdInt,
    time::{LEGACY_EPOCH, UNIX_EPOCH},
};

/// Returns a mask of the low `bits` bits.
#[inline]
pub(crate) const fn mask(bits: u8) -> u64 {
    match bits {
        0 => 0,
        64.. => u64::MAX,
        n => (1 << n) - 1,
    }
}

/// The partition of a packed id into timestamp, node and sequence fields.
///
/// From most to least significant bit an id is laid out as:
///
/// ```text
/// | tick (timestamp_bits) | node (node_bits) | [flag] counter (sequence_bits) |
/// ```
///
/// The tick is the number of milliseconds since `epoch_millis`, shifted right
/// by `tick_shift` (a shift of 6 gives 64 ms ticks: fewer ids per second, a
/// longer usable timestamp range).
///
/// When `sequence_flag` is set, the top bit of the sequence field is always 1
/// and the counter only uses the remaining `sequence_bits - 1` bits. The flag
/// keeps every id of a layout the same length once rendered as a numeral (see
/// [`RadixExt`]); it does nothing for ordering or uniqueness.
///
/// A layout is plain data. It is checked against a concrete [`IdInt`] with
/// [`BitLayout::validate`] when a generator is built and never changes
/// afterwards.
///
/// # Example
///
/// ```
/// use trendid::BitLayout;
///
/// let layout = BitLayout::WORKER;
/// let id: u64 = layout.encode(1_000, 3, 7);
/// let parts = layout.decode(id);
/// assert_eq!((parts.tick, parts.node, parts.sequence), (1_000, 3, 7));
/// ```
///
/// [`RadixExt`]: crate::RadixExt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitLayout {
    pub timestamp_bits: u8,
    pub node_bits: u8,
    pub sequence_bits: u8,
    pub epoch_millis: u64,
    pub tick_shift: u8,
    pub sequence_flag: bool,
}

/// The fields recovered from a packed id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdParts {
    pub tick: u64,
    pub node: u64,
    /// The counter value, without the flag bit.
    pub sequence: u64,
}

impl BitLayout {
    /// 44-bit millisecond timestamp, 12-bit node (6-bit cluster + 6-bit
    /// server), 7-bit sequence. Usable until the year 2527.
    pub const CLUSTERED: Self = Self::new(44, 12, 7);

    /// 44-bit millisecond timestamp, 7-bit instance, 12-bit sequence.
    pub const WORKER: Self = Self::new(44, 7, 12);

    /// 42-bit millisecond timestamp since 2018-01-01 UTC+8, 16-bit node (8-bit
    /// machine + 8-bit process), 5-bit sequence.
    pub const COMPACT: Self = Self::new(42, 16, 5).with_epoch_millis(LEGACY_EPOCH.as_millis() as u64);

    /// 128-bit layout: 48-bit timestamp in 64 ms ticks, 40-bit node (24-bit
    /// machine + 16-bit process), 24-bit flagged sequence.
    pub const WIDE: Self = Self::new(48, 40, 24)
        .with_tick_shift(6)
        .with_sequence_flag(true);

    /// 128-bit layout without a node field: 47-bit millisecond timestamp and a
    /// 32-bit per-tick tail. Meant for random reseeding, where two processes
    /// only collide if they pick the same tail in the same millisecond.
    pub const RANDOM_TAIL: Self = Self::new(47, 0, 32);

    /// Creates a layout with millisecond ticks since the Unix epoch and no
    /// flag bit.
    pub const fn new(timestamp_bits: u8, node_bits: u8, sequence_bits: u8) -> Self {
        Self {
            timestamp_bits,
            node_bits,
            sequence_bits,
            epoch_millis: UNIX_EPOCH.as_millis() as u64,
            tick_shift: 0,
            sequence_flag: false,
        }
    }

    pub const fn with_epoch_millis(mut self, epoch_millis: u64) -> Self {
        self.epoch_millis = epoch_millis;
        self
    }

    pub const fn with_tick_shift(mut self, tick_shift: u8) -> Self {
        self.tick_shift = tick_shift;
        self
    }

    pub const fn with_sequence_flag(mut self, sequence_flag: bool) -> Self {
        self.sequence_flag = sequence_flag;
        self
    }

    /// Total number of bits the layout occupies.
    pub const fn total_bits(&self) -> u32 {
        self.timestamp_bits as u32 + self.node_bits as u32 + self.sequence_bits as u32
    }

    /// Checks that the layout is usable with ids stored in `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::FieldTooWide`] if a field exceeds 64 bits
    /// - [`Error::InvalidLayout`] if there is no timestamp or counter space,
    ///   or the tick shift is unreasonably large
    /// - [`Error::LayoutOverflow`] if the fields do not fit `T::CAPACITY`
    pub fn validate<T: IdInt>(&self) -> Result<()> {
        for (field, bits) in [
            ("timestamp", self.timestamp_bits),
            ("node", self.node_bits),
            ("sequence", self.sequence_bits),
        ] {
            if bits > 64 {
                return Err(Error::FieldTooWide { field, bits });
            }
        }
        if self.timestamp_bits == 0 {
            return Err(Error::InvalidLayout {
                reason: "timestamp field needs at least one bit",
            });
        }
        if self.counter_bits() == 0 {
            return Err(Error::InvalidLayout {
                reason: "sequence counter needs at least one bit",
            });
        }
        if self.tick_shift >= 32 {
            return Err(Error::InvalidLayout {
                reason: "tick shift must be below 32",
            });
        }
        let total = self.total_bits();
        if total > T::CAPACITY {
            return Err(Error::LayoutOverflow {
                total,
                capacity: T::CAPACITY,
            });
        }
        Ok(())
    }

    /// Width of the counter, excluding the flag bit.
    pub const fn counter_bits(&self) -> u8 {
        if self.sequence_flag {
            self.sequence_bits.saturating_sub(1)
        } else {
            self.sequence_bits
        }
    }

    pub const fn max_timestamp(&self) -> u64 {
        mask(self.timestamp_bits)
    }

    pub const fn max_node(&self) -> u64 {
        mask(self.node_bits)
    }

    /// Largest counter value (excluding the flag bit).
    pub const fn max_sequence(&self) -> u64 {
        mask(self.counter_bits())
    }

    /// Length of one tick in milliseconds.
    pub const fn tick_millis(&self) -> u64 {
        1 << self.tick_shift
    }

    /// Converts Unix milliseconds into a tick. Times before the epoch map to
    /// tick 0.
    #[inline]
    pub const fn tick_of(&self, unix_millis: u64) -> u64 {
        unix_millis.saturating_sub(self.epoch_millis) >> self.tick_shift
    }

    /// Converts a tick back into Unix milliseconds (start of the tick).
    #[inline]
    pub const fn millis_of(&self, tick: u64) -> u64 {
        let offset = (tick as u128) << self.tick_shift;
        let offset = if offset > u64::MAX as u128 {
            u64::MAX
        } else {
            offset as u64
        };
        self.epoch_millis.saturating_add(offset)
    }

    #[inline]
    const fn flag(&self) -> u64 {
        if self.sequence_flag {
            1 << self.counter_bits()
        } else {
            0
        }
    }

    /// Packs the three fields into one id.
    ///
    /// Each field is masked to its width; callers are expected to pass values
    /// that already fit. The layout must have passed [`Self::validate`] for
    /// `T`.
    #[inline]
    pub fn encode<T: IdInt>(&self, tick: u64, node: u64, sequence: u64) -> T {
        debug_assert!(tick <= self.max_timestamp(), "tick {tick} overflows layout");
        debug_assert!(node <= self.max_node(), "node {node} overflows layout");
        debug_assert!(sequence <= self.max_sequence(), "sequence {sequence} overflows layout");

        let sequence_shift = u32::from(self.sequence_bits);
        let timestamp_shift = u32::from(self.node_bits) + sequence_shift;

        let raw = (u128::from(tick & self.max_timestamp()) << timestamp_shift)
            | (u128::from(node & self.max_node()) << sequence_shift)
            | u128::from((sequence & self.max_sequence()) | self.flag());

        T::try_from_u128(raw).unwrap_or(T::ZERO)
    }

    /// Splits an id back into its fields.
    #[inline]
    pub fn decode<T: IdInt>(&self, id: T) -> IdParts {
        let raw = id.to_u128();
        let sequence_shift = u32::from(self.sequence_bits);
        let timestamp_shift = u32::from(self.node_bits) + sequence_shift;

        IdParts {
            tick: (raw >> timestamp_shift) as u64 & self.max_timestamp(),
            node: (raw >> sequence_shift) as u64 & self.max_node(),
            sequence: raw as u64 & self.max_sequence(),
        }
    }

    /// Returns `true` if `id` could have been produced with this layout: no
    /// bits above the layout are set and the flag bit, if any, is present.
    pub fn is_valid<T: IdInt>(&self, id: T) -> bool {
        let raw = id.to_u128();
        let total = self.total_bits();
        let fits = total >= 128 || raw >> total == 0;
        let flagged = !self.sequence_flag || raw as u64 & self.flag() != 0;
        fits && flagged
    }
}
