use crate::RingError;
use std::fmt;

/// A validated ring capacity: always a positive power of two.
///
/// Slot indices are computed as `sequence & mask`, which is only correct
/// when the capacity is a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capacity(usize);

impl Capacity {
    /// Largest capacity accepted. Keeps `sequence + capacity` well inside
    /// the `u64` sequence space used for slot stamps.
    #[cfg(target_pointer_width = "64")]
    pub const MAX: Self = Self(1 << 32);

    /// Largest capacity accepted: the top power of two of `usize`.
    #[cfg(not(target_pointer_width = "64"))]
    pub const MAX: Self = Self(1 << (usize::BITS - 1));

    /// Validates `capacity`, rejecting zero and non-powers of two.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity.is_power_of_two() && capacity <= Self::MAX.0 {
            Ok(Self(capacity))
        } else {
            Err(RingError::invalid_capacity(capacity as u64))
        }
    }

    /// Builds `2^bits` at compile time.
    ///
    /// Panics (at const-eval time for constants) if `2^bits` exceeds
    /// [`Capacity::MAX`].
    pub const fn from_bits(bits: u8) -> Self {
        assert!(bits as u32 <= Self::MAX.bits(), "capacity exceeds Capacity::MAX");
        Self(1 << bits)
    }

    /// Returns the number of slots.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(self) -> usize {
        self.0 - 1
    }

    /// Returns `log2(capacity)`.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0.trailing_zeros()
    }
}

impl TryFrom<usize> for Capacity {
    type Error = RingError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = RingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .map_err(|_| RingError::invalid_capacity(value))
            .and_then(Self::new)
    }
}

impl From<Capacity> for usize {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Configuration for a [`Ring`](crate::Ring).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of slots (default: 1024)
    pub capacity: Capacity,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: Capacity, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
        }
    }

    /// Returns a copy with metrics switched on or off.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Returns the capacity of the ring buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity.mask()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: Capacity::from_bits(10), // 1024 slots
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (256 slots)
pub const LOW_LATENCY_CONFIG: Config = Config::new(Capacity::from_bits(8), false);

/// High throughput configuration (64K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(Capacity::from_bits(16), false);
