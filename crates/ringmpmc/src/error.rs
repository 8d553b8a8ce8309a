//! Error types for queue construction and push.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when constructing a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A queue needs at least one slot to rotate through.
    #[error("queue capacity must be non-zero")]
    Zero,

    /// The capacity does not fit the cursor encoding or the address space.
    #[error("queue capacity {requested} exceeds the maximum of {max}")]
    TooLarge {
        /// The capacity that was asked for.
        requested: usize,
        /// The largest capacity this element type can have.
        max: usize,
    },
}

/// Returned by [`push`](crate::BoundedQueue::push) when the queue is full.
///
/// Carries the rejected value so the caller can retry, drop it, or route it
/// elsewhere.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct QueueFullError<T>(pub T);

impl<T> QueueFullError<T> {
    /// Takes back the value that could not be pushed.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFullError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFullError(..)")
    }
}

impl<T> fmt::Display for QueueFullError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> std::error::Error for QueueFullError<T> {}
