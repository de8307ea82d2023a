//! ring-selftest - Concurrency Self-Test for mpmc-ring
//!
//! A correctness oracle for [`mpmc_ring::Ring`], not a benchmark: `P`
//! producers push disjoint ranges of `1..=N` through one ring while `C`
//! consumers pull `N/C` items each. After every thread joins, the ring must
//! be empty and the consumers' combined count and sum must equal `N` and
//! `N(N+1)/2`.
//!
//! # Example
//!
//! ```
//! use mpmc_ring::Capacity;
//! use ring_selftest::{run_stress, StressConfig};
//!
//! let config = StressConfig::new(2, 2, 10_000, Capacity::new(64).unwrap());
//! let report = run_stress(&config).unwrap();
//! assert!(report.passed());
//! ```

mod config;
mod error;
mod stress;
mod suite;
mod trace;

pub use config::{BackoffKind, StressConfig};
pub use error::{Role, SelftestError};
pub use stress::{run_stress, ConsumerTally, StressReport};
pub use suite::{default_suite, run_all, Selftest, QUEUE_SIZE};
pub use trace::init_tracing;
