use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe ring counters.
///
/// Updated with `Relaxed` ordering only when `Config::enable_metrics` is set,
/// so they never take part in slot synchronization.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    produced: AtomicU64,
    consumed: AtomicU64,
    full_rejections: AtomicU64,
    empty_polls: AtomicU64,
    contended_retries: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_produced(&self, n: u64) {
        self.produced.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_consumed(&self, n: u64) {
        self.consumed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_full_rejection(&self) {
        self.full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_contended_retry(&self) {
        self.contended_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            produced: self.produced.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            full_rejections: self.full_rejections.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            contended_retries: self.contended_retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a ring's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Items accepted by `produce`.
    pub produced: u64,
    /// Items handed out by `consume`.
    pub consumed: u64,
    /// `produce` calls that found the ring full.
    pub full_rejections: u64,
    /// `consume` calls that found the ring empty.
    pub empty_polls: u64,
    /// Lost compare-and-swap races on `head` or `tail`.
    pub contended_retries: u64,
}

impl MetricsSnapshot {
    /// Items produced but not yet consumed at snapshot time.
    pub fn in_flight(&self) -> u64 {
        self.produced.saturating_sub(self.consumed)
    }
}
