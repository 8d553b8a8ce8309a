use crate::invariants::{
    debug_assert_advanced, debug_assert_bounded_count, debug_assert_index_in_bounds,
};
use crate::storage::{HeapStorage, InlineStorage, Slot, Storage};
use crate::sync::{fence, AtomicUsize, Ordering};
use crate::{Backoff, CacheAligned, CapacityError, QueueFullError};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};

// =============================================================================
// CURSOR ENCODING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// ## Cursors
//
// `head` and `tail` each pack `{ lap, index }` into one usize. `one_lap` is the
// smallest power of two strictly greater than the capacity:
//
//     index = cursor & (one_lap - 1)
//     lap   = cursor & !(one_lap - 1)
//
// Advancing a cursor either bumps the index within the lap or, past the last
// slot, jumps to `{ lap + one_lap, 0 }` (wrapping on usize overflow). Because
// the index never reaches `one_lap - 1`, `cursor + 1` never carries into the
// lap bits.
//
//     empty  ⇔ head == tail
//     full   ⇔ head + one_lap == tail
//
// ## Slot stamps
//
// Each slot's stamp says whose turn it is:
// - `stamp == tail`           free, the producer holding `tail` may write
// - `stamp == head + 1`       written, the consumer holding `head` may read
// - `stamp == head + one_lap` read, free for the next lap's producer
//
// ## Memory Ordering Protocol
//
// **Producer:**
// 1. Load `tail` Relaxed (exploratory; the stamp check validates it)
// 2. Load slot stamp Acquire (pairs with the consumer's Release on free)
// 3. CAS `tail` → next, SeqCst / Relaxed (claims the slot)
// 4. Write value (exclusive: only the CAS winner touches it)
// 5. Store stamp = tail + 1 Release (publishes the value)
//
// **Consumer:** symmetric on `head`, storing `stamp = head + one_lap` Release
// after moving the value out.
//
// The cursor CAS only decides who owns which slot; the stamp's
// Release/Acquire pair is what carries the payload between threads. Before
// concluding "full" or "empty" from the *other* cursor, a SeqCst fence keeps a
// stale read of that cursor from producing a false verdict.
//
// =============================================================================

/// What the full-queue hook of [`BoundedQueue::push_or_else`] decided.
enum OnFull<T> {
    /// Another producer is mid-flight; back off and try again.
    Retry(T),
    /// Stop and hand this value back to the caller.
    Stop(T),
}

/// Bounded lock-free MPMC queue over a ring of stamped slots.
///
/// Any number of threads may [`push`](Self::push) and [`pop`](Self::pop)
/// concurrently through a shared reference. The queue is lock-free (some
/// thread always makes progress) but not wait-free.
///
/// The backing storage is a type parameter; use the aliases:
/// - [`Queue<T>`]: heap ring, capacity chosen at runtime.
/// - [`StackQueue<T, N>`]: inline ring, capacity fixed at compile time.
///
/// # Memory Layout
///
/// ```text
/// ┌────────────────────────────────────────────────────────────────────┐
/// │ head: CacheAligned<AtomicUsize>   ← consumers CAS                  │
/// ├────────────────────────────────────────────────────────────────────┤
/// │ tail: CacheAligned<AtomicUsize>   ← producers CAS                  │
/// ├────────────────────────────────────────────────────────────────────┤
/// │ one_lap: usize                    ← immutable                      │
/// │ storage: S                        ← Box<[Slot<T>]> or [Slot<T>; N] │
/// └────────────────────────────────────────────────────────────────────┘
/// ```
///
/// # Example
///
/// ```
/// use ringmpmc_rs::Queue;
///
/// let q = Queue::new(2).unwrap();
///
/// assert!(q.push('a').is_ok());
/// assert!(q.push('b').is_ok());
/// assert_eq!(q.push('c').unwrap_err().into_inner(), 'c');
/// assert_eq!(q.pop(), Some('a'));
/// ```
pub struct BoundedQueue<T, S: Storage<T>> {
    /// Next position to pop from.
    head: CacheAligned<AtomicUsize>,
    /// Next position to push to.
    tail: CacheAligned<AtomicUsize>,
    /// `{ lap: 1, index: 0 }`.
    one_lap: usize,
    storage: S,
    _marker: PhantomData<T>,
}

/// Queue backed by a heap-allocated ring.
pub type Queue<T> = BoundedQueue<T, HeapStorage<T>>;

/// Queue backed by an inline ring of `N` slots.
pub type StackQueue<T, const N: usize> = BoundedQueue<T, InlineStorage<T, N>>;

// Safety: values are only ever touched by the thread that won the cursor CAS
// for that slot's generation, and handed across threads through the stamp's
// Release/Acquire pair, so sharing the queue only requires `T: Send`.
unsafe impl<T: Send, S: Storage<T>> Send for BoundedQueue<T, S> {}
unsafe impl<T: Send, S: Storage<T>> Sync for BoundedQueue<T, S> {}

impl<T> BoundedQueue<T, HeapStorage<T>> {
    /// Creates a queue holding up to `capacity` elements on the heap.
    ///
    /// Fails with [`CapacityError::Zero`] for a zero capacity and with
    /// [`CapacityError::TooLarge`] when the ring could not be encoded or
    /// allocated.
    ///
    /// ```
    /// use ringmpmc_rs::{CapacityError, Queue};
    ///
    /// assert!(Queue::<u64>::new(100).is_ok());
    /// assert_eq!(Queue::<u64>::new(0).unwrap_err(), CapacityError::Zero);
    /// ```
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        HeapStorage::new(capacity).map(Self::with_storage)
    }
}

impl<T, const N: usize> BoundedQueue<T, InlineStorage<T, N>> {
    /// Creates a queue whose `N` slots are embedded in the struct.
    ///
    /// `N == 0` does not compile:
    ///
    /// ```compile_fail
    /// use ringmpmc_rs::StackQueue;
    ///
    /// let q = StackQueue::<u64, 0>::new();
    /// ```
    pub fn new() -> Self {
        Self::with_storage(InlineStorage::new())
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, InlineStorage<T, N>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S: Storage<T>> BoundedQueue<T, S> {
    /// Creates a queue over an already-built slot ring.
    pub fn with_storage(storage: S) -> Self {
        let capacity = storage.slots().len();

        // One lap is the smallest power of two greater than `capacity`.
        // Storage guarantees 1 <= capacity <= MAX_CAPACITY, so this fits.
        let one_lap = (capacity + 1).next_power_of_two();

        tracing::debug!(capacity, one_lap, storage = S::KIND, "bounded queue created");

        Self {
            head: CacheAligned::new(AtomicUsize::new(0)),
            tail: CacheAligned::new(AtomicUsize::new(0)),
            one_lap,
            storage,
            _marker: PhantomData,
        }
    }

    // ---------------------------------------------------------------------
    // CURSOR HELPERS
    // ---------------------------------------------------------------------

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.slots().len()
    }

    /// Index half of a cursor.
    #[inline]
    fn index(&self, cursor: usize) -> usize {
        cursor & (self.one_lap - 1)
    }

    /// Cursor one position after `cursor`, wrapping to the next lap.
    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        let index = self.index(cursor);
        let lap = cursor & !(self.one_lap - 1);

        let next = if index + 1 < self.capacity() {
            // Same lap, incremented index.
            cursor + 1
        } else {
            // One lap forward, index wraps around to zero.
            lap.wrapping_add(self.one_lap)
        };
        debug_assert_advanced!(cursor, next, self.one_lap);
        next
    }

    /// Slot addressed by `cursor`.
    #[inline]
    fn slot(&self, cursor: usize) -> &Slot<T> {
        let index = self.index(cursor);
        let slots = self.storage.slots();
        debug_assert_index_in_bounds!(index, slots.len());
        // SAFETY: every cursor is built by `advance`, which keeps the index
        // below the capacity.
        unsafe { slots.get_unchecked(index) }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Shared producer loop. `on_full` runs when the target slot still holds
    /// last lap's value, with `(value, tail, new_tail, slot)`.
    fn push_or_else<F>(&self, mut value: T, on_full: F) -> Result<(), T>
    where
        F: Fn(T, usize, usize, &Slot<T>) -> OnFull<T>,
    {
        let mut backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let new_tail = self.advance(tail);
            let slot = self.slot(tail);
            let stamp = slot.stamp.load(Ordering::Acquire);

            if stamp == tail {
                // Free for this generation: try to claim it.
                match self.tail.compare_exchange_weak(
                    tail,
                    new_tail,
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS makes this thread the only
                        // writer of the slot until the stamp is published.
                        slot.value.with_mut(|ptr| unsafe {
                            ptr.write(MaybeUninit::new(value));
                        });
                        slot.stamp.store(tail + 1, Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => {
                        tail = current;
                        backoff.spin();
                    }
                }
            } else if stamp.wrapping_add(self.one_lap) == tail + 1 {
                // Still holding last lap's value: full, or a consumer is
                // about to free it.
                fence(Ordering::SeqCst);
                value = match on_full(value, tail, new_tail, slot) {
                    OnFull::Retry(value) => value,
                    OnFull::Stop(value) => return Err(value),
                };
                backoff.spin();
                tail = self.tail.load(Ordering::Relaxed);
            } else {
                // A concurrent push or pop has not finished with this slot.
                backoff.snooze();
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to push an element into the queue.
    ///
    /// If the queue is full the element is handed back inside the error;
    /// the queue itself is left untouched.
    pub fn push(&self, value: T) -> Result<(), QueueFullError<T>> {
        self.push_or_else(value, |value, tail, _, _| {
            let head = self.head.load(Ordering::Relaxed);

            if head.wrapping_add(self.one_lap) == tail {
                OnFull::Stop(value)
            } else {
                OnFull::Retry(value)
            }
        })
        .map_err(QueueFullError)
    }

    /// Pushes an element, evicting the oldest one if the queue is full.
    ///
    /// Returns the evicted element, if any. This turns the queue into a
    /// ring that always keeps the most recent `capacity` elements.
    ///
    /// ```
    /// use ringmpmc_rs::Queue;
    ///
    /// let q = Queue::new(2).unwrap();
    ///
    /// assert_eq!(q.force_push(10), None);
    /// assert_eq!(q.force_push(20), None);
    /// assert_eq!(q.force_push(30), Some(10));
    /// assert_eq!(q.pop(), Some(20));
    /// ```
    pub fn force_push(&self, value: T) -> Option<T> {
        self.push_or_else(value, |value, tail, new_tail, slot| {
            let head = tail.wrapping_sub(self.one_lap);
            let new_head = new_tail.wrapping_sub(self.one_lap);

            // Evict by moving the head past the oldest slot.
            if self
                .head
                .compare_exchange_weak(head, new_head, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                self.tail.store(new_tail, Ordering::SeqCst);

                // SAFETY: moving both cursors past this slot gives this thread
                // sole ownership of it; it holds last lap's initialized value.
                let old = slot.value.with_mut(|ptr| unsafe {
                    mem::replace(&mut *ptr, MaybeUninit::new(value)).assume_init()
                });
                slot.stamp.store(tail + 1, Ordering::Release);
                OnFull::Stop(old)
            } else {
                OnFull::Retry(value)
            }
        })
        .err()
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Attempts to pop an element from the queue.
    ///
    /// Returns `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            let slot = self.slot(head);
            let stamp = slot.stamp.load(Ordering::Acquire);

            if stamp == head + 1 {
                // Written for this generation: try to claim it.
                let new_head = self.advance(head);

                match self.head.compare_exchange_weak(
                    head,
                    new_head,
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the Acquire load of `stamp` synchronized with
                        // the producer's Release, and winning the CAS makes this
                        // thread the only reader of this generation.
                        let value =
                            slot.value.with_mut(|ptr| unsafe { ptr.read().assume_init() });
                        slot.stamp
                            .store(head.wrapping_add(self.one_lap), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => {
                        head = current;
                        backoff.spin();
                    }
                }
            } else if stamp == head {
                // Not written yet: empty, or a producer is about to publish.
                fence(Ordering::SeqCst);
                let tail = self.tail.load(Ordering::Relaxed);

                if tail == head {
                    return None;
                }

                backoff.spin();
                head = self.head.load(Ordering::Relaxed);
            } else {
                // A concurrent push or pop has not finished with this slot.
                backoff.snooze();
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Pop with adaptive backoff. Spins, yields, then gives up.
    ///
    /// Useful for a consumer that expects a value shortly and would rather
    /// wait a few scheduler quanta than return empty-handed.
    pub fn pop_with_backoff(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        while !backoff.is_completed() {
            if let Some(value) = self.pop() {
                return Some(value);
            }
            backoff.snooze();
        }
        None
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns true if the queue is empty.
    ///
    /// Under concurrent pushes and pops the answer may already be stale, but a
    /// race can only make it say "not empty" for a queue that just became
    /// empty, never the reverse.
    pub fn is_empty(&self) -> bool {
        let head = self.head.load(Ordering::SeqCst);
        let tail = self.tail.load(Ordering::SeqCst);

        // Head is loaded first: a push landing between the two loads shows up
        // as tail != head, which errs towards "not empty".
        tail == head
    }

    /// Returns true if the queue is full.
    ///
    /// Like [`is_empty`](Self::is_empty), a race can only bias the answer
    /// towards "not full".
    pub fn is_full(&self) -> bool {
        let tail = self.tail.load(Ordering::SeqCst);
        let head = self.head.load(Ordering::SeqCst);

        // Tail is loaded first: a pop landing between the two loads shows up
        // as a head more than one lap behind, which errs towards "not full".
        head.wrapping_add(self.one_lap) == tail
    }

    /// Returns the number of elements in the queue.
    ///
    /// A snapshot: concurrent operations may change it before it is used.
    pub fn len(&self) -> usize {
        loop {
            let tail = self.tail.load(Ordering::SeqCst);
            let head = self.head.load(Ordering::SeqCst);

            // Only trust the pair if tail held still while head was read.
            // No backoff here: a saturated producer side can keep this
            // spinning.
            if self.tail.load(Ordering::SeqCst) == tail {
                let hix = self.index(head);
                let tix = self.index(tail);
                let capacity = self.capacity();

                let len = if hix < tix {
                    tix - hix
                } else if hix > tix {
                    capacity - hix + tix
                } else if tail == head {
                    0
                } else {
                    capacity
                };
                debug_assert_bounded_count!(len, capacity);
                return len;
            }
        }
    }
}

impl<T, S: Storage<T>> Drop for BoundedQueue<T, S> {
    fn drop(&mut self) {
        if !mem::needs_drop::<T>() {
            return;
        }

        let head = self.head.load(Ordering::Relaxed);
        let capacity = self.capacity();
        let hix = self.index(head);

        for offset in 0..self.len() {
            // Leftover elements sit in [head, tail), possibly wrapping.
            let index = if hix + offset < capacity {
                hix + offset
            } else {
                hix + offset - capacity
            };
            let slot = &self.storage.slots()[index];
            // SAFETY: `&mut self` means no other thread is mid-operation, so
            // every slot in [head, tail) holds an initialized value.
            slot.value.with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
        }
    }
}

impl<T, S: Storage<T>> fmt::Debug for BoundedQueue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("storage", &S::KIND)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
