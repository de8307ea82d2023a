use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_slot_owned,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::sync::{AtomicU64, Ordering};
use crate::{Capacity, Config, RingError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Any number of producers and consumers may call `produce` / `consume`
// concurrently. There is no lock: a caller owns a slot exactly when it wins
// the compare-and-swap that moves `tail` (producer) or `head` (consumer) past
// that slot's sequence number.
//
// ## Sequence Numbers (ABA Prevention)
//
// `head` and `tail` are unbounded u64 sequence numbers, never reset. The slot
// for sequence `pos` is `slots[pos & mask]`. At 10 billion operations per
// second the counters take decades to wrap.
//
// ## Slot Stamps
//
// Every slot carries a `stamp` that says which sequence number it is ready
// for and in which state:
//
//   vacant(pos)   = 2 * pos       slot is free for the producer of `pos`
//   occupied(pos) = 2 * pos + 1   slot holds the item of `pos`
//
// Slot `i` starts as `vacant(i)`. The producer of `pos` publishes
// `occupied(pos)`; the consumer of `pos` releases the slot for the next lap by
// publishing `vacant(pos + capacity)`. Keeping the two states apart in the low
// bit makes a one-slot ring work: a full slot can never be mistaken for a free
// one.
//
// ## Memory Ordering Protocol
//
// **Producer (`produce`):**
// 1. Load `tail` with Relaxed (just a starting guess)
// 2. Load the slot stamp with Acquire (synchronizes with the consumer that
//    freed it, so its read of the old value happens-before our write)
// 3. stamp == vacant(tail): CAS `tail` -> `tail + 1` (Relaxed; ownership, not
//    data, is decided here)
// 4. Write the item into the slot (exclusive: we won the CAS)
// 5. Store stamp = occupied(tail) with Release (publishes the write)
//
// **Consumer (`consume`):**
// 1. Load `head` with Relaxed
// 2. Load the slot stamp with Acquire (synchronizes with the producer's
//    Release in step 5 above: the item is fully visible)
// 3. stamp == occupied(head): CAS `head` -> `head + 1`
// 4. Read the item out of the slot
// 5. Store stamp = vacant(head + capacity) with Release (hands the slot to
//    the producer one lap ahead)
//
// A stamp behind the expected value means full (producer) or empty
// (consumer) and the call returns immediately. A stamp ahead of it means our
// view of `tail`/`head` is stale; reload and try again. No path ever waits for
// another thread to finish its operation.
//
// =============================================================================

#[inline]
const fn vacant(pos: u64) -> u64 {
    pos << 1
}

#[inline]
const fn occupied(pos: u64) -> u64 {
    (pos << 1) | 1
}

/// Signed distance between an observed stamp and the one we are waiting for.
#[inline]
fn stamp_lag(stamp: u64, expected: u64) -> i64 {
    stamp.wrapping_sub(expected) as i64
}

struct Slot<T> {
    stamp: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded lock-free MPMC ring.
///
/// A fixed array of `capacity` slots with atomic `head` and `tail`
/// progress counters. `produce` and `consume` are single non-blocking
/// attempts: a full ring rejects the item and an empty ring yields `None`.
/// Retry policy belongs to the caller (see [`crate::produce_with`]).
///
/// Ordering: one ring-wide FIFO of slot occupancy. Items from one producer
/// are consumed in the order that producer submitted them; items from
/// different producers interleave in whatever order their reservations won.
pub struct Ring<T> {
    // === CONSUMER HOT === (cache-padded)
    /// Next sequence to consume.
    head: CachePadded<AtomicU64>,

    // === PRODUCER HOT === (cache-padded)
    /// Next sequence to produce.
    tail: CachePadded<AtomicU64>,

    // === DATA ===
    slots: Box<[Slot<T>]>,

    // === COLD STATE ===
    metrics: Metrics,
    config: Config,
}

// Safety: items are moved in by one thread and out by another, never shared,
// so T: Send is enough. Slot access is serialized by the stamp protocol.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a ring with `capacity` slots.
    ///
    /// Fails with [`RingError::InvalidCapacity`] unless `capacity` is a
    /// positive power of two.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let capacity = Capacity::new(capacity)?;
        Ok(Self::with_config(Config::new(capacity, false)))
    }

    /// Creates a ring from an already validated configuration.
    pub fn with_config(config: Config) -> Self {
        let slots = (0..config.capacity() as u64)
            .map(|i| Slot {
                stamp: AtomicU64::new(vacant(i)),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots,
            metrics: Metrics::new(),
            config,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Returns the configuration the ring was built with.
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    #[inline]
    fn slot(&self, pos: u64) -> &Slot<T> {
        &self.slots[(pos as usize) & self.config.mask()]
    }

    /// Returns the number of items in the ring.
    ///
    /// Advisory while other threads are producing or consuming.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail.saturating_sub(head) as usize).min(self.capacity())
    }

    /// Returns true if `head == tail` at the instant of the check.
    ///
    /// Advisory under concurrent producers; exact once they have stopped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Tries to append `item` at the tail.
    ///
    /// Returns `Err(item)` without blocking if the ring is full, handing the
    /// item back so the caller can retry, park or drop it.
    pub fn produce(&self, item: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(tail);
            let stamp = slot.stamp.load(Ordering::Acquire);
            let lag = stamp_lag(stamp, vacant(tail));

            if lag == 0 {
                let next = tail.wrapping_add(1);
                match self.tail.compare_exchange_weak(
                    tail,
                    next,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        debug_assert_bounded_count!(
                            next.saturating_sub(self.head.load(Ordering::Relaxed)),
                            self.capacity()
                        );
                        debug_assert_slot_owned!(slot, vacant(tail));

                        // SAFETY: Slot access is exclusive because:
                        // 1. We won the CAS for `tail`, so no other producer owns it
                        // 2. The stamp was vacant(tail): the previous lap's consumer
                        //    has moved its item out, and our Acquire load
                        //    synchronizes with its Release
                        // 3. No consumer reads it until we publish occupied(tail)
                        unsafe {
                            (*slot.value.get()).write(item);
                        }
                        slot.stamp.store(occupied(tail), Ordering::Release);

                        if self.config.enable_metrics {
                            self.metrics.add_produced(1);
                        }
                        return Ok(());
                    }
                    Err(current) => {
                        tail = current;
                        if self.config.enable_metrics {
                            self.metrics.add_contended_retry();
                        }
                    }
                }
            } else if lag < 0 {
                // Slot still holds (or is handing off) the item one lap back.
                if self.config.enable_metrics {
                    self.metrics.add_full_rejection();
                }
                return Err(item);
            } else {
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Boolean form of [`produce`](Self::produce). The item is dropped when
    /// the ring is full.
    #[inline]
    pub fn try_produce(&self, item: T) -> bool {
        self.produce(item).is_ok()
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Takes the oldest item, or returns `None` without blocking if the ring
    /// is empty.
    pub fn consume(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(head);
            let stamp = slot.stamp.load(Ordering::Acquire);
            let lag = stamp_lag(stamp, occupied(head));

            if lag == 0 {
                let next = head.wrapping_add(1);
                match self.head.compare_exchange_weak(
                    head,
                    next,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        debug_assert_head_not_past_tail!(next, self.tail.load(Ordering::Relaxed));
                        debug_assert_slot_owned!(slot, occupied(head));

                        // SAFETY: Slot access is exclusive because:
                        // 1. We won the CAS for `head`, so no other consumer owns it
                        // 2. The stamp was occupied(head), published with Release
                        //    after the producer's write; our Acquire load makes
                        //    the whole item visible
                        // 3. assume_init_read moves ownership out; the slot is
                        //    logically uninitialized until the next producer
                        let item = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.stamp.store(
                            vacant(head.wrapping_add(self.capacity() as u64)),
                            Ordering::Release,
                        );

                        if self.config.enable_metrics {
                            self.metrics.add_consumed(1);
                        }
                        return Some(item);
                    }
                    Err(current) => {
                        head = current;
                        if self.config.enable_metrics {
                            self.metrics.add_contended_retry();
                        }
                    }
                }
            } else if lag < 0 {
                // Nothing published at `head` yet.
                if self.config.enable_metrics {
                    self.metrics.add_empty_poll();
                }
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Consumes up to `max_items`, stopping early when the ring runs empty.
    ///
    /// Each item is a separate [`consume`](Self::consume); other consumers
    /// may interleave.
    pub fn consume_up_to<F>(&self, max_items: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        let mut count = 0;
        while count < max_items {
            match self.consume() {
                Some(item) => {
                    handler(item);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Destroys the ring, calling `release` once for every item still in it,
    /// oldest first. Returns how many items were released.
    ///
    /// Taking `self` guarantees no `produce`/`consume` is in flight. For a
    /// shared ring, recover ownership first (e.g. `Arc::try_unwrap`).
    pub fn cleanup_with<F>(mut self, release: F) -> usize
    where
        F: FnMut(T),
    {
        self.release_remaining(release)
    }

    /// Destroys the ring, dropping any items still in it.
    pub fn cleanup(self) {
        drop(self);
    }

    /// Moves every committed item out, advancing `head` before each handoff
    /// so a panicking `release` never sees the same item twice.
    fn release_remaining<F>(&mut self, mut release: F) -> usize
    where
        F: FnMut(T),
    {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let capacity = self.capacity() as u64;
        let mut released = 0;

        for pos in head..tail {
            let slot = self.slot(pos);
            if slot.stamp.load(Ordering::Relaxed) != occupied(pos) {
                continue;
            }

            // SAFETY: `&mut self` rules out concurrent access, and the stamp
            // says this slot holds the committed item for `pos`.
            let item = unsafe { (*slot.value.get()).assume_init_read() };
            slot.stamp.store(vacant(pos + capacity), Ordering::Relaxed);
            self.head.store(pos + 1, Ordering::Relaxed);

            release(item);
            released += 1;
        }

        self.head.store(tail, Ordering::Relaxed);
        released
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        self.release_remaining(drop);
    }
}

impl<T> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
