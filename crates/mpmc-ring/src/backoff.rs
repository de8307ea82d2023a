//! Caller-side retry policies.
//!
//! `Ring::produce` and `Ring::consume` never wait. Callers that want to wait
//! for space or for an item wrap them in [`produce_with`] / [`consume_with`]
//! and pick how to spend the time between attempts.

use crate::Ring;
use std::hint;
use std::thread;
use std::time::Duration;

/// What to do after an attempt reported full or empty.
pub trait BackoffPolicy {
    /// Waits a little before the next attempt.
    fn snooze(&mut self);

    /// Called after a successful attempt.
    fn reset(&mut self) {}
}

/// Busy-spin with a CPU pause hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinLoop;

impl BackoffPolicy for SpinLoop {
    #[inline]
    fn snooze(&mut self) {
        hint::spin_loop();
    }
}

/// Give the rest of the time slice back to the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldNow;

impl BackoffPolicy for YieldNow {
    #[inline]
    fn snooze(&mut self) {
        thread::yield_now();
    }
}

/// Put the thread to sleep for a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct Sleep(pub Duration);

impl BackoffPolicy for Sleep {
    fn snooze(&mut self) {
        thread::sleep(self.0);
    }
}

/// Adaptive backoff strategy (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10;

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin then yield.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= Self::YIELD_LIMIT {
                self.step += 1;
            }
        }
    }

    /// True once spinning has been exhausted and every further snooze yields.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffPolicy for Backoff {
    #[inline]
    fn snooze(&mut self) {
        Backoff::snooze(self);
    }

    #[inline]
    fn reset(&mut self) {
        Backoff::reset(self);
    }
}

impl<B: BackoffPolicy + ?Sized> BackoffPolicy for &mut B {
    fn snooze(&mut self) {
        (**self).snooze();
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Produces `item`, snoozing on `policy` for as long as the ring is full.
pub fn produce_with<T, B>(ring: &Ring<T>, mut item: T, policy: &mut B)
where
    B: BackoffPolicy + ?Sized,
{
    loop {
        match ring.produce(item) {
            Ok(()) => {
                policy.reset();
                return;
            }
            Err(rejected) => {
                item = rejected;
                policy.snooze();
            }
        }
    }
}

/// Consumes one item, snoozing on `policy` for as long as the ring is empty.
pub fn consume_with<T, B>(ring: &Ring<T>, policy: &mut B) -> T
where
    B: BackoffPolicy + ?Sized,
{
    loop {
        if let Some(item) = ring.consume() {
            policy.reset();
            return item;
        }
        policy.snooze();
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();

        assert_eq!(b.step, 0);

        b.spin();
        assert!(b.step > 0);

        while !b.is_completed() {
            b.snooze();
        }
        assert!(b.step > Backoff::YIELD_LIMIT);

        b.reset();
        assert_eq!(b.step, 0);
    }

    #[derive(Default)]
    struct Counting {
        snoozes: usize,
        resets: usize,
    }

    impl BackoffPolicy for Counting {
        fn snooze(&mut self) {
            self.snoozes += 1;
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_produce_with_does_not_snooze_when_space() {
        let ring = Ring::<u32>::new(2).unwrap();
        let mut policy = Counting::default();

        produce_with(&ring, 7, &mut policy);
        assert_eq!(policy.snoozes, 0);
        assert_eq!(policy.resets, 1);
        assert_eq!(consume_with(&ring, &mut policy), 7);
        assert_eq!(policy.resets, 2);
    }

    #[test]
    fn test_consume_with_waits_for_producer() {
        let ring = std::sync::Arc::new(Ring::<u32>::new(1).unwrap());
        let producer = {
            let ring = std::sync::Arc::clone(&ring);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                produce_with(&*ring, 1, &mut YieldNow);
                produce_with(&*ring, 2, &mut SpinLoop);
            })
        };

        let mut backoff = Backoff::new();
        assert_eq!(consume_with(&*ring, &mut backoff), 1);
        assert_eq!(consume_with(&*ring, &mut Sleep(Duration::from_micros(50))), 2);
        producer.join().unwrap();
        assert!(ring.is_empty());
    }
}
