use crate::sync::{spin_loop, yield_now};

/// Adaptive backoff strategy (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS → give up.
///
/// One instance belongs to one retry loop. It is not shared between threads
/// and should be discarded (or [`reset`](Backoff::reset)) once the loop exits.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10; // Then give up

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Number of PAUSE hints the next spin issues.
    #[inline]
    fn spins(&self) -> u32 {
        1 << self.step.min(Self::SPIN_LIMIT)
    }

    /// Light spin with PAUSE hints.
    ///
    /// Used when a CAS lost a race: another thread made progress, so retrying
    /// soon is likely to succeed.
    #[inline]
    pub fn spin(&mut self) {
        for _ in 0..self.spins() {
            spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin then yield.
    ///
    /// Used when waiting on another thread to finish publishing or releasing a
    /// slot, which may take a scheduler quantum if that thread was preempted.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else {
            yield_now();
            if self.step <= Self::YIELD_LIMIT {
                self.step += 1;
            }
        }
    }

    /// Check if we've exhausted patience.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
