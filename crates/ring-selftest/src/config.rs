//! Stress workload configuration.

use crate::SelftestError;
use mpmc_ring::Capacity;
use serde::Serialize;

/// How workers wait when `produce` reports full or `consume` reports empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// `thread::yield_now` between attempts.
    #[default]
    Yield,
    /// Busy-spin with a pause hint.
    Spin,
    /// Spin with growing bursts, then yield.
    Adaptive,
}

/// Configuration for one stress run.
///
/// Producer `i` pushes `i * N/P + 1 ..= (i + 1) * N/P`; every consumer pulls
/// exactly `N/C` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    /// Producer thread count `P`.
    pub producers: usize,
    /// Consumer thread count `C`.
    pub consumers: usize,
    /// Total element count `N`, divisible by both `P` and `C`.
    pub elements: u64,
    /// Ring capacity `Q`.
    pub capacity: Capacity,
    /// Retry policy for full/empty.
    pub backoff: BackoffKind,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            elements: 1_000_000,
            capacity: Capacity::from_bits(10),
            backoff: BackoffKind::Yield,
        }
    }
}

impl StressConfig {
    /// Creates a configuration with the default backoff.
    pub fn new(producers: usize, consumers: usize, elements: u64, capacity: Capacity) -> Self {
        Self {
            producers,
            consumers,
            elements,
            capacity,
            backoff: BackoffKind::default(),
        }
    }

    /// Sets the producer count.
    pub fn with_producers(mut self, producers: usize) -> Self {
        self.producers = producers;
        self
    }

    /// Sets the consumer count.
    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers;
        self
    }

    /// Sets the element count.
    pub fn with_elements(mut self, elements: u64) -> Self {
        self.elements = elements;
        self
    }

    /// Sets the ring capacity.
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = backoff;
        self
    }

    /// Items each producer pushes.
    pub fn per_producer(&self) -> u64 {
        self.elements / self.producers as u64
    }

    /// Items each consumer pulls.
    pub fn per_consumer(&self) -> u64 {
        self.elements / self.consumers as u64
    }

    /// Closed-form sum of `1..=N`.
    pub fn expected_total(&self) -> u128 {
        let n = u128::from(self.elements);
        if n % 2 == 0 {
            (n / 2) * (n + 1)
        } else {
            n * ((n + 1) / 2)
        }
    }

    /// Checks that the workload splits evenly and every value fits a handle.
    pub fn validate(&self) -> Result<(), SelftestError> {
        let invalid = |reason: String| Err(SelftestError::InvalidConfig { reason });

        if self.producers == 0 || self.consumers == 0 {
            return invalid(format!(
                "need at least one producer and one consumer (got {}p/{}c)",
                self.producers, self.consumers
            ));
        }
        if self.elements == 0 {
            return invalid("element count must be positive".to_string());
        }
        if self.elements % self.producers as u64 != 0 {
            return invalid(format!(
                "{} elements not divisible by {} producers",
                self.elements, self.producers
            ));
        }
        if self.elements % self.consumers as u64 != 0 {
            return invalid(format!(
                "{} elements not divisible by {} consumers",
                self.elements, self.consumers
            ));
        }
        if usize::try_from(self.elements).is_err() {
            return invalid(format!("{} elements exceed the handle range", self.elements));
        }
        Ok(())
    }
}
