use ringmpmc_rs::Queue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MSG_PER_PRODUCER: u64 = 5_000_000;
const CAPACITY: usize = 4096;

fn benchmark_config(producers: usize, consumers: usize) {
    info!("{} producer(s) × {} consumer(s)", producers, consumers);

    let queue = Arc::new(Queue::<u64>::new(CAPACITY).expect("benchmark capacity is valid"));
    let target = producers as u64 * MSG_PER_PRODUCER;
    let consumed = Arc::new(AtomicU64::new(0));

    let start = Instant::now();

    // Spawn producers
    let mut handles = vec![];
    for p in 0..producers {
        let q = Arc::clone(&queue);
        handles.push(thread::spawn(move || {
            let mut full_retries = 0u64;
            for i in 0..MSG_PER_PRODUCER {
                let mut value = ((p as u64) << 40) | i;
                while let Err(full) = q.push(value) {
                    value = full.into_inner();
                    full_retries += 1;
                    thread::yield_now();
                }
            }
            full_retries
        }));
    }

    // Spawn consumers
    let mut consumer_handles = vec![];
    for _ in 0..consumers {
        let q = Arc::clone(&queue);
        let consumed = Arc::clone(&consumed);
        consumer_handles.push(thread::spawn(move || {
            let mut checksum = 0u64;
            while consumed.load(Ordering::Relaxed) < target {
                match q.pop() {
                    Some(v) => {
                        checksum = checksum.wrapping_add(v);
                        consumed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => thread::yield_now(),
                }
            }
            checksum
        }));
    }

    let full_retries: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let checksum = consumer_handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold(0u64, u64::wrapping_add);
    let duration = start.elapsed();

    let throughput = target as f64 / duration.as_secs_f64();
    info!(
        total = target,
        duration = ?duration,
        mps = %format!("{:.2}", throughput / 1_000_000.0),
        full_retries,
        checksum,
        "run complete"
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        messages_per_producer = MSG_PER_PRODUCER,
        capacity = CAPACITY,
        "RingMPMC scaling benchmark"
    );

    for (producers, consumers) in [(1, 1), (2, 2), (4, 4), (8, 2), (2, 8)] {
        benchmark_config(producers, consumers);
    }

    info!("benchmark complete");
}
