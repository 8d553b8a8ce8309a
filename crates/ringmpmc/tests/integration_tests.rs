//! Integration tests for the bounded MPMC queue.
//!
//! Single-threaded scenarios pin down full/empty/len semantics for both
//! storage modes; the threaded tests check that values are neither lost nor
//! duplicated under contention.

#![cfg(not(feature = "loom"))]

use crossbeam_utils::thread;
use ringmpmc_rs::{CapacityError, Queue, StackQueue, MAX_CAPACITY};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_capacity_two_scenario() {
    let q = Queue::<i32>::new(2).unwrap();

    assert!(q.push(10).is_ok());
    assert!(q.push(20).is_ok());
    assert_eq!(q.push(30).unwrap_err().into_inner(), 30);
    assert_eq!(q.pop(), Some(10));
    assert_eq!(q.pop(), Some(20));
    assert_eq!(q.pop(), None);

    assert!(q.push(0).is_ok());
    assert!(q.push(1).is_ok());
    assert_eq!(q.push(2).unwrap_err().into_inner(), 2);
    assert_eq!(q.pop(), Some(0));
    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.pop(), None);
}

#[test]
fn test_capacity_two_scenario_inline() {
    let q = StackQueue::<i32, 2>::new();

    assert!(q.push(10).is_ok());
    assert!(q.push(20).is_ok());
    assert!(q.push(30).is_err());
    assert_eq!(q.pop(), Some(10));
    assert_eq!(q.pop(), Some(20));
    assert_eq!(q.pop(), None);

    assert!(q.push(0).is_ok());
    assert!(q.push(1).is_ok());
    assert!(q.push(2).is_err());
    assert_eq!(q.pop(), Some(0));
    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.pop(), None);
}

#[test]
fn test_full_and_empty_for_many_capacities() {
    for capacity in 1..=33 {
        let q = Queue::<usize>::new(capacity).unwrap();
        assert_eq!(q.capacity(), capacity);
        assert!(q.is_empty());
        assert!(!q.is_full());

        for i in 0..capacity {
            assert!(q.push(i).is_ok(), "capacity {}: push {} failed", capacity, i);
            assert!(!q.is_empty());
        }
        assert!(q.is_full(), "capacity {} not full after {} pushes", capacity, capacity);

        assert_eq!(q.pop(), Some(0));
        assert!(!q.is_full());

        for i in 1..capacity {
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.is_empty());
    }
}

#[test]
fn test_len_tracks_pushes_and_pops() {
    let q = Queue::<u32>::new(8).unwrap();
    for k in 0..=8u32 {
        assert_eq!(q.len(), k as usize);
        if k < 8 {
            q.push(k).unwrap();
        }
    }
    for j in 1..=8usize {
        q.pop().unwrap();
        assert_eq!(q.len(), 8 - j);
    }
}

#[test]
fn test_push_to_full_does_not_disturb_order() {
    let q = StackQueue::<u32, 4>::new();
    for i in 0..4 {
        q.push(i).unwrap();
    }
    for rejected in 100..110 {
        assert_eq!(q.push(rejected).unwrap_err().into_inner(), rejected);
    }
    assert_eq!(q.len(), 4);
    let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
    assert_eq!(drained, vec![0, 1, 2, 3]);
}

#[test]
fn test_pop_empty_repeatedly() {
    let q = Queue::<String>::new(3).unwrap();
    for _ in 0..1_000 {
        assert_eq!(q.pop(), None);
    }
    assert!(q.is_empty());
    assert_eq!(q.len(), 0);

    q.push("still works".to_string()).unwrap();
    assert_eq!(q.pop().as_deref(), Some("still works"));
}

#[test]
fn test_capacity_errors() {
    assert_eq!(Queue::<u8>::new(0).unwrap_err(), CapacityError::Zero);
    assert!(matches!(
        Queue::<u8>::new(MAX_CAPACITY + 1),
        Err(CapacityError::TooLarge { requested, .. }) if requested == MAX_CAPACITY + 1
    ));
    assert!(matches!(
        Queue::<[u8; 4096]>::new(usize::MAX / 1024),
        Err(CapacityError::TooLarge { .. })
    ));
}

#[test]
fn test_force_push_evicts_oldest() {
    let q = Queue::<u32>::new(3).unwrap();
    for i in 0..3 {
        assert_eq!(q.force_push(i), None);
    }
    assert_eq!(q.force_push(3), Some(0));
    assert_eq!(q.force_push(4), Some(1));
    assert!(q.is_full());
    assert_eq!(q.len(), 3);

    let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
    assert_eq!(drained, vec![2, 3, 4]);

    // Behaves like push when there is room
    assert_eq!(q.force_push(5), None);
    assert_eq!(q.pop(), Some(5));
}

#[test]
fn test_pop_with_backoff_gives_up_when_empty() {
    let q = StackQueue::<u8, 1>::new();
    assert_eq!(q.pop_with_backoff(), None);
    q.push(9).unwrap();
    assert_eq!(q.pop_with_backoff(), Some(9));
}

#[test]
fn test_fifo_ordering_single_producer_single_consumer() {
    const N: u64 = 100_000;
    let q = Queue::<u64>::new(64).unwrap();

    thread::scope(|s| {
        s.spawn(|_| {
            for i in 0..N {
                let mut value = i;
                while let Err(full) = q.push(value) {
                    value = full.into_inner();
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0;
        while expected < N {
            if let Some(v) = q.pop() {
                assert_eq!(v, expected, "FIFO violation: expected {}, got {}", expected, v);
                expected += 1;
            } else {
                std::thread::yield_now();
            }
        }
    })
    .unwrap();

    assert!(q.is_empty());
}

/// Runs `producers` × `per_producer` pushes against `consumers` poppers and
/// checks the popped multiset equals the pushed one.
fn run_mpmc(capacity: usize, producers: usize, consumers: usize, per_producer: usize) {
    let total = producers * per_producer;
    let q = Queue::<(usize, usize)>::new(capacity).unwrap();
    let popped = AtomicUsize::new(0);
    let max_len = AtomicUsize::new(0);

    let per_consumer: Vec<Vec<(usize, usize)>> = thread::scope(|s| {
        for p in 0..producers {
            let q = &q;
            s.spawn(move |_| {
                for i in 0..per_producer {
                    let mut value = (p, i);
                    while let Err(full) = q.push(value) {
                        value = full.into_inner();
                        std::thread::yield_now();
                    }
                }
            });
        }

        let handles: Vec<_> = (0..consumers)
            .map(|_| {
                s.spawn(|_| {
                    let mut got = Vec::new();
                    let mut polls = 0usize;
                    while popped.load(Ordering::Acquire) < total {
                        // len() retries under contention; sample it
                        if polls % 64 == 0 {
                            max_len.fetch_max(q.len(), Ordering::Relaxed);
                        }
                        polls += 1;
                        match q.pop() {
                            Some(v) => {
                                got.push(v);
                                popped.fetch_add(1, Ordering::AcqRel);
                            }
                            None => std::thread::yield_now(),
                        }
                    }
                    got
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(max_len.load(Ordering::Relaxed) <= capacity);

    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for got in &per_consumer {
        // Each consumer sees any one producer's values in push order
        let mut last: HashMap<usize, usize> = HashMap::new();
        for &(p, i) in got {
            if let Some(&prev) = last.get(&p) {
                assert!(i > prev, "producer {} order broken: {} after {}", p, i, prev);
            }
            last.insert(p, i);
            *counts.entry((p, i)).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), total, "values lost");
    assert!(counts.values().all(|&c| c == 1), "values duplicated");
    assert!(q.is_empty());
}

#[test]
fn test_mpmc_no_loss_no_duplication() {
    run_mpmc(16, 4, 4, 10_000);
}

#[test]
fn test_mpmc_tiny_capacity() {
    run_mpmc(1, 3, 3, 5_000);
}

#[test]
fn test_mpmc_more_producers_than_slots() {
    run_mpmc(3, 8, 2, 2_000);
}
