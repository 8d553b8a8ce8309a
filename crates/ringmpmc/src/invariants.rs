//! Debug assertion macros for queue invariants.
//!
//! They are only active in debug builds (`#[cfg(debug_assertions)]`), so there
//! is zero overhead in release builds.

// =============================================================================
// Slot Index
// =============================================================================

/// Assert that a cursor's index half addresses a real slot.
///
/// **Invariant**: `cursor & (one_lap - 1) < capacity`
///
/// Used in: every slot lookup before `get_unchecked()`
macro_rules! debug_assert_index_in_bounds {
    ($index:expr, $capacity:expr) => {
        debug_assert!(
            $index < $capacity,
            "slot index {} out of bounds for capacity {}",
            $index,
            $capacity
        )
    };
}

// =============================================================================
// Bounded Count
// =============================================================================

/// Assert that a length snapshot does not exceed capacity.
///
/// **Invariant**: `0 ≤ len ≤ capacity`
///
/// Used in: `len()` after decoding a stable head/tail pair
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "len {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// Lap Arithmetic
// =============================================================================

/// Assert that an advanced cursor either stayed in its lap or wrapped to
/// index 0 of the next one.
///
/// **Invariant**: `next == cursor + 1` within a lap, otherwise
/// `next & (one_lap - 1) == 0`
///
/// Used in: `advance()`
macro_rules! debug_assert_advanced {
    ($cursor:expr, $next:expr, $one_lap:expr) => {
        debug_assert!(
            $next == $cursor + 1 || $next & ($one_lap - 1) == 0,
            "cursor {:#x} advanced to {:#x} (one_lap {:#x})",
            $cursor,
            $next,
            $one_lap
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_advanced;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_index_in_bounds;
