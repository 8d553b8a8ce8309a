//! Loom-based concurrency tests for ringmpmc-rs.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! With the `loom` feature the queue's atomics, fences and slot cells are
//! loom's, so these models explore the real push/pop code under every
//! interleaving loom can reach within the preemption bound.

#![cfg(feature = "loom")]

use loom::sync::Arc;
use loom::thread;
use ringmpmc_rs::{Queue, StackQueue};

/// Keeps the state space tractable: the contention loops spin, and every
/// spin hint is a scheduling point under loom.
fn model<F>(f: F)
where
    F: Fn() + Sync + Send + 'static,
{
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(2);
    builder.check(f);
}

/// One producer, one consumer: whatever the consumer gets is in push order.
#[test]
fn loom_spsc_order() {
    model(|| {
        let q = Arc::new(Queue::<u32>::new(2).unwrap());
        let qp = Arc::clone(&q);
        let qc = Arc::clone(&q);

        let producer = thread::spawn(move || {
            qp.push(1).unwrap();
            qp.push(2).unwrap();
        });
        let consumer = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..2 {
                if let Some(v) = qc.pop() {
                    received.push(v);
                }
            }
            received
        });

        producer.join().unwrap();
        let mut received = consumer.join().unwrap();
        while let Some(v) = q.pop() {
            received.push(v);
        }
        assert_eq!(received, vec![1, 2]);
    });
}

/// Two producers race for the only slot: exactly one wins.
#[test]
fn loom_producers_race_for_last_slot() {
    model(|| {
        let q = Arc::new(StackQueue::<u32, 1>::new());
        let q1 = Arc::clone(&q);
        let q2 = Arc::clone(&q);

        let a = thread::spawn(move || q1.push(1).is_ok());
        let b = thread::spawn(move || q2.push(2).is_ok());

        let won_a = a.join().unwrap();
        let won_b = b.join().unwrap();
        assert!(won_a ^ won_b, "exactly one push must succeed");

        let v = q.pop().unwrap();
        assert_eq!(v, if won_a { 1 } else { 2 });
        assert!(q.pop().is_none());
    });
}

/// Two consumers race for one value: it is delivered exactly once.
#[test]
fn loom_consumers_race_for_one_value() {
    model(|| {
        let q = Arc::new(Queue::<u32>::new(2).unwrap());
        q.push(7).unwrap();
        let q1 = Arc::clone(&q);
        let q2 = Arc::clone(&q);

        let a = thread::spawn(move || q1.pop());
        let b = thread::spawn(move || q2.pop());

        let got: Vec<_> = [a.join().unwrap(), b.join().unwrap()]
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(got, vec![7]);
        assert!(q.is_empty());
    });
}

/// A push into a full queue races the pop that frees the slot for the
/// next lap: the popped value is the old one and nothing is lost.
#[test]
fn loom_push_pop_across_wrap() {
    model(|| {
        let q = Arc::new(Queue::<u32>::new(1).unwrap());
        q.push(1).unwrap();
        let qp = Arc::clone(&q);
        let qc = Arc::clone(&q);

        let consumer = thread::spawn(move || qc.pop());
        let producer = thread::spawn(move || qp.push(2).is_ok());

        let first = consumer.join().unwrap();
        let pushed = producer.join().unwrap();
        assert_eq!(first, Some(1));

        let rest = q.pop();
        if pushed {
            assert_eq!(rest, Some(2));
        } else {
            assert_eq!(rest, None);
        }
        assert!(q.is_empty());
    });
}

/// The lap has already wrapped once; a push that wraps it again races a
/// pop. The push always lands and the value is delivered exactly once.
#[test]
fn loom_wrapping_push_handoff() {
    model(|| {
        let q = Arc::new(Queue::<u32>::new(1).unwrap());
        q.push(1).unwrap();
        assert_eq!(q.pop(), Some(1));
        let qp = Arc::clone(&q);
        let qc = Arc::clone(&q);

        let producer = thread::spawn(move || qp.push(2).is_ok());
        let consumer = thread::spawn(move || qc.pop());

        assert!(producer.join().unwrap(), "push into an empty queue must land");
        let got: Vec<_> = consumer.join().unwrap().into_iter().chain(q.pop()).collect();
        assert_eq!(got, vec![2]);
        assert!(q.is_empty());
    });
}
