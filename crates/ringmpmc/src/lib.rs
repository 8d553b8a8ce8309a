//! RingMPMC - Bounded Lock-Free Multi-Producer Multi-Consumer Queue
//!
//! A fixed-capacity ring of stamped slots shared by any number of producers
//! and consumers. Each slot carries a generation stamp that says whose turn it
//! is, and the head and tail cursors pack a lap counter next to the slot index
//! so that claiming a slot is a single compare-and-swap.
//!
//! # Key Features
//!
//! - Lock-free push/pop from any number of threads
//! - Heap ([`Queue`]) or inline ([`StackQueue`]) storage, one algorithm
//! - Cache-line padded cursors (per-architecture [`CACHE_LINE_SIZE`])
//! - Adaptive backoff (spin → yield) inside contention loops
//! - Overwrite mode via [`force_push`](BoundedQueue::force_push)
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::Queue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(Queue::<u64>::new(64).unwrap());
//!
//! let producers: Vec<_> = (0..4)
//!     .map(|p| {
//!         let queue = Arc::clone(&queue);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 let mut value = p * 1000 + i;
//!                 while let Err(full) = queue.push(value) {
//!                     value = full.into_inner();
//!                     thread::yield_now();
//!                 }
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let mut received = 0;
//! while received < 400 {
//!     if queue.pop().is_some() {
//!         received += 1;
//!     }
//! }
//!
//! for p in producers {
//!     p.join().unwrap();
//! }
//! assert!(queue.is_empty());
//! ```

mod backoff;
mod cache;
mod error;
mod invariants;
mod queue;
mod storage;
mod sync;

pub use backoff::Backoff;
pub use cache::{CacheAligned, CACHE_LINE_SIZE};
pub use error::{CapacityError, QueueFullError};
pub use queue::{BoundedQueue, Queue, StackQueue};
pub use storage::{HeapStorage, InlineStorage, Storage, MAX_CAPACITY};
