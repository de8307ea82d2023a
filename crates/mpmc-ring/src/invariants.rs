//! Debug assertion macros for ring invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`); release builds
//! pay nothing for them.

// =============================================================================
// Bounded count: 0 <= tail - head <= capacity
// =============================================================================

/// Assert that count does not exceed capacity.
///
/// Used in: `produce()` after winning the tail CAS
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity as u64,
            "bounded count violated: {} items in a ring of {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head does not advance past tail.
///
/// Used in: `consume()` after winning the head CAS
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head <= $tail,
            "head {} advanced beyond tail {}",
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// Slot ownership: a stamp changes only at its owner's publish step
// =============================================================================

/// Assert that a claimed slot still carries the stamp we claimed it with.
///
/// Winning the CAS on `head`/`tail` grants exclusive ownership of the slot,
/// so nobody else may have republished it in between.
///
/// Used in: `produce()` / `consume()` just before the publishing store
macro_rules! debug_assert_slot_owned {
    ($slot:expr, $expected:expr) => {
        debug_assert_eq!(
            $slot.stamp.load($crate::sync::Ordering::Relaxed),
            $expected,
            "slot stamp changed while owned"
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_slot_owned;
