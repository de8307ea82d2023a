//! mpmc-ring - Bounded Lock-Free Multi-Producer Multi-Consumer Ring
//!
//! A fixed-capacity circular array of slots for handing work items (packet
//! descriptors, crypto jobs, any `T: Send`) between producer and consumer
//! threads without a global lock.
//!
//! # Key Features
//!
//! - Per-slot sequence stamps: a slot is visible to a consumer only after
//!   its producer's write is published, so no torn or stale values
//! - Cache-padded `head`/`tail` counters
//! - Non-blocking `produce`/`consume`: full and empty are return values
//! - Pluggable caller-side backoff (spin, yield, adaptive, sleep)
//! - `cleanup_with` hands undrained items to a release callback exactly once
//!
//! # Example
//!
//! ```
//! use mpmc_ring::{consume_with, produce_with, Ring, YieldNow};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ring = Arc::new(Ring::<u64>::new(1024).unwrap());
//!
//! let producer = {
//!     let ring = Arc::clone(&ring);
//!     thread::spawn(move || {
//!         for i in 1..=100 {
//!             produce_with(&*ring, i, &mut YieldNow);
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! for _ in 0..100 {
//!     sum += consume_with(&*ring, &mut YieldNow);
//! }
//! producer.join().unwrap();
//!
//! assert_eq!(sum, 5050);
//! assert!(ring.is_empty());
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod ring;
mod sync;

pub use backoff::{consume_with, produce_with, Backoff, BackoffPolicy, Sleep, SpinLoop, YieldNow};
pub use config::{Capacity, Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::RingError;
pub use metrics::MetricsSnapshot;
pub use ring::Ring;
