//! Backing storage for the slot ring.
//!
//! The queue algorithm only needs a fixed slice of slots, so the choice
//! between a heap-allocated ring and one embedded inline in the queue struct
//! is a type parameter rather than a second copy of the algorithm:
//!
//! - [`HeapStorage<T>`]: `Box<[Slot<T>]>`, capacity chosen at runtime. The box
//!   is freed when the queue is dropped.
//! - [`InlineStorage<T, N>`]: `[Slot<T>; N]`, capacity fixed at compile time,
//!   no allocation at all.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Slot<T>                                      │
//! │   stamp: AtomicUsize   ← lap | index         │
//! │   value: UnsafeCell<MaybeUninit<T>>          │
//! └──────────────────────────────────────────────┘
//! ```

use crate::sync::{AtomicUsize, UnsafeCell};
use crate::CapacityError;
use std::mem::{self, MaybeUninit};

/// Largest capacity whose `one_lap` (the next power of two above it) still
/// fits in a `usize`, leaving at least one bit for the lap counter.
pub const MAX_CAPACITY: usize = usize::MAX >> 1;

// =============================================================================
// SLOT
// =============================================================================

/// One cell of the ring.
///
/// `stamp == tail` means the slot is free for the producer that claims that
/// tail value. `stamp == head + 1` means it holds a value for the consumer
/// that claims that head value.
pub struct Slot<T> {
    pub(crate) stamp: AtomicUsize,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    /// A slot at `{ lap: 0, index }`, free for the first producer to reach it.
    fn new(index: usize) -> Self {
        Self {
            stamp: AtomicUsize::new(index),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

// =============================================================================
// STORAGE TRAIT
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// A fixed array of slots the queue rotates through.
///
/// Sealed: the queue relies on every slot starting with `stamp == index` and on
/// the slice length never changing, so only the two storages in this crate
/// implement it.
pub trait Storage<T>: sealed::Sealed {
    /// Short name used in diagnostics.
    const KIND: &'static str;

    /// The slot ring. Always non-empty and never longer than [`MAX_CAPACITY`].
    fn slots(&self) -> &[Slot<T>];
}

/// Largest number of `Slot<T>` a single allocation may hold.
fn max_capacity<T>() -> usize {
    let slot = mem::size_of::<Slot<T>>().max(1);
    MAX_CAPACITY.min(isize::MAX as usize / slot)
}

// =============================================================================
// HEAP STORAGE
// =============================================================================

/// Heap-allocated slot ring with a runtime capacity.
pub struct HeapStorage<T> {
    slots: Box<[Slot<T>]>,
}

impl<T> HeapStorage<T> {
    /// Allocates `capacity` slots.
    ///
    /// Fails for a zero capacity, or for one so large that the cursor encoding
    /// or the allocation size would overflow.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            tracing::warn!("rejected queue with zero capacity");
            return Err(CapacityError::Zero);
        }

        let max = max_capacity::<T>();
        if capacity > max {
            tracing::warn!(requested = capacity, max, "rejected oversized queue capacity");
            return Err(CapacityError::TooLarge {
                requested: capacity,
                max,
            });
        }

        // Set each stamp to `{ lap: 0, index: i }`.
        let slots = (0..capacity).map(Slot::new).collect();
        Ok(Self { slots })
    }
}

impl<T> sealed::Sealed for HeapStorage<T> {}

impl<T> Storage<T> for HeapStorage<T> {
    const KIND: &'static str = "heap";

    #[inline]
    fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }
}

// =============================================================================
// INLINE STORAGE
// =============================================================================

/// Slot ring embedded directly in the queue, sized at compile time.
///
/// Mind the footprint: every slot is a `usize` stamp plus a `T`, and the whole
/// array lives wherever the queue lives. Large rings belong in a `Box` or a
/// `static`.
pub struct InlineStorage<T, const N: usize> {
    slots: [Slot<T>; N],
}

impl<T, const N: usize> InlineStorage<T, N> {
    const VALID_CAPACITY: () = assert!(
        N > 0 && N <= MAX_CAPACITY,
        "inline queue capacity must be between 1 and MAX_CAPACITY"
    );

    /// Builds the ring with every stamp at `{ lap: 0, index: i }`.
    ///
    /// A zero `N` is rejected when the type is instantiated.
    pub fn new() -> Self {
        let () = Self::VALID_CAPACITY;

        Self {
            slots: std::array::from_fn(Slot::new),
        }
    }
}

impl<T, const N: usize> Default for InlineStorage<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> sealed::Sealed for InlineStorage<T, N> {}

impl<T, const N: usize> Storage<T> for InlineStorage<T, N> {
    const KIND: &'static str = "inline";

    #[inline]
    fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }
}
