//! Atomic primitives used by the ring.
//!
//! With the `loom` feature enabled these resolve to loom's model-checked
//! atomics so `tests/loom_tests.rs` explores the real `Ring` rather than a
//! hand-written copy of its protocol.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicU64, Ordering};

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicU64, Ordering};
