//! Synchronization primitives used by the queue.
//!
//! With the `loom` feature every atomic, fence, spin hint, yield and slot cell
//! comes from `loom`, so `loom::model` can explore the real queue code rather
//! than a hand-written copy of the protocol. Without it these are thin aliases
//! for `std`.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::{hint::spin_loop, thread::yield_now};

#[cfg(not(feature = "loom"))]
pub(crate) use std::{hint::spin_loop, thread::yield_now};

#[cfg(feature = "loom")]
pub(crate) use loom::cell::UnsafeCell;

/// `std::cell::UnsafeCell` behind loom's closure-based access API.
#[cfg(not(feature = "loom"))]
#[derive(Debug)]
pub(crate) struct UnsafeCell<T>(std::cell::UnsafeCell<T>);

#[cfg(not(feature = "loom"))]
impl<T> UnsafeCell<T> {
    #[inline]
    pub(crate) const fn new(data: T) -> Self {
        Self(std::cell::UnsafeCell::new(data))
    }

    #[inline]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }
}
