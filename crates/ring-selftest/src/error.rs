//! Error types for self-test runs.

use mpmc_ring::RingError;
use std::io;
use thiserror::Error;

/// Which side of the ring a worker thread was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Pushes items.
    Producer,
    /// Pulls items.
    Consumer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Errors that can occur while running a self-test.
#[derive(Debug, Error)]
pub enum SelftestError {
    /// The workload cannot be split evenly across workers.
    #[error("invalid stress configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it.
        reason: String,
    },

    /// The ring itself rejected the configuration.
    #[error(transparent)]
    Ring(#[from] RingError),

    /// A worker thread could not be started.
    #[error("failed to spawn {role} {index}")]
    Spawn {
        /// Side the worker would have run on.
        role: Role,
        /// Worker index within its side.
        index: usize,
        /// Error returned by the OS.
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked.
    #[error("{role} {index} panicked")]
    WorkerPanicked {
        /// Side the worker ran on.
        role: Role,
        /// Worker index within its side.
        index: usize,
    },

    /// Items were left behind after every worker finished.
    #[error("ring not drained: {remaining} items left after all workers joined")]
    NotDrained {
        /// Items released during cleanup.
        remaining: usize,
    },

    /// The consumed count or sum differs from the closed-form expectation.
    #[error("count {count} (expected {expected_count}), total {total} (expected {expected_total})")]
    Mismatch {
        /// Items received across all consumers.
        count: u64,
        /// Items produced, `N`.
        expected_count: u64,
        /// Sum of the received values.
        total: u128,
        /// `N(N+1)/2`.
        expected_total: u128,
    },

    /// One or more tests of a suite failed.
    #[error("{} of {total} self-tests failed", .failures.len())]
    Failed {
        /// Name and error of each failed test, in run order.
        failures: Vec<(&'static str, SelftestError)>,
        /// Tests run.
        total: usize,
    },
}

impl SelftestError {
    /// Returns `true` if the ring lost, duplicated or corrupted items, as
    /// opposed to the run never getting started.
    #[inline]
    pub fn is_correctness_defect(&self) -> bool {
        match self {
            Self::NotDrained { .. } | Self::Mismatch { .. } => true,
            Self::Failed { failures, .. } => failures.iter().any(|(_, err)| err.is_correctness_defect()),
            _ => false,
        }
    }
}
