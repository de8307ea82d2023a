//! Property-based tests for the ring's sequential contract.
//!
//! Random operation sequences run against both the ring and a `VecDeque`
//! model bounded to the same capacity; every observable result must agree.

#![cfg(not(feature = "loom"))]

use mpmc_ring::{Capacity, Ring};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Produce(u32),
    Consume,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u32>().prop_map(Op::Produce), Just(Op::Consume)]
}

// =============================================================================
// Bounded count: 0 <= len <= capacity
// =============================================================================

proptest! {
    #[test]
    fn prop_matches_bounded_fifo_model(
        bits in 0u8..6,
        ops in prop::collection::vec(op(), 1..200),
    ) {
        let capacity = Capacity::from_bits(bits).get();
        let ring = Ring::<u32>::new(capacity).unwrap();
        let mut model = VecDeque::with_capacity(capacity);

        for op in ops {
            match op {
                Op::Produce(v) => {
                    let accepted = ring.produce(v).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(v);
                    }
                }
                Op::Consume => {
                    prop_assert_eq!(ring.consume(), model.pop_front());
                }
            }

            prop_assert_eq!(ring.len(), model.len());
            prop_assert!(ring.len() <= capacity);
            prop_assert_eq!(ring.is_empty(), model.is_empty());
            prop_assert_eq!(ring.is_full(), model.len() == capacity);
        }
    }
}

// =============================================================================
// Full/empty signaling
// =============================================================================

proptest! {
    #[test]
    fn prop_fill_to_capacity_then_reject(bits in 0u8..10) {
        let capacity = Capacity::from_bits(bits).get();
        let ring = Ring::<usize>::new(capacity).unwrap();

        prop_assert_eq!(ring.consume(), None);
        for i in 0..capacity {
            prop_assert!(ring.produce(i).is_ok(), "produce {} of {} failed", i, capacity);
        }
        prop_assert_eq!(ring.produce(capacity), Err(capacity));

        for i in 0..capacity {
            prop_assert_eq!(ring.consume(), Some(i));
        }
        prop_assert_eq!(ring.consume(), None);
    }
}

// =============================================================================
// Capacity validation
// =============================================================================

proptest! {
    #[test]
    fn prop_capacity_accepts_only_powers_of_two(requested in any::<i64>()) {
        let valid = requested > 0 && (requested as u64).is_power_of_two() && requested <= 1 << 32;
        prop_assert_eq!(Capacity::try_from(requested).is_ok(), valid);
    }
}

// =============================================================================
// Release-on-cleanup: each remaining item exactly once, in slot order
// =============================================================================

proptest! {
    #[test]
    fn prop_cleanup_releases_remaining(
        produced in 0usize..64,
        consumed in 0usize..64,
    ) {
        let ring = Ring::<usize>::new(64).unwrap();
        for i in 0..produced {
            ring.produce(i).unwrap();
        }
        let taken = ring.consume_up_to(consumed, |_| {});

        let mut released = Vec::new();
        let n = ring.cleanup_with(|item| released.push(item));

        prop_assert_eq!(n, produced - taken);
        prop_assert_eq!(released, (taken..produced).collect::<Vec<_>>());
    }
}
