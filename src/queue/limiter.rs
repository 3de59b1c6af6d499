//! Concurrency limiter: resizable permit accounting
//!
//! A pair of atomic counters instead of a semaphore: available permits are
//! always `ceiling - running`, so shrinking the ceiling never revokes a
//! permit held by an in-flight task; dispatch just stays throttled until
//! enough tasks finish.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// Counting permit pool with a runtime-adjustable ceiling
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    ceiling: AtomicUsize,
    running: AtomicUsize,
}

impl ConcurrencyLimiter {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: AtomicUsize::new(ceiling),
            running: AtomicUsize::new(0),
        }
    }

    /// Try to take one permit; never blocks
    pub fn try_acquire(&self) -> bool {
        let ceiling = self.ceiling.load(Ordering::Acquire);
        self.running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |running| {
                if running < ceiling { Some(running + 1) } else { None }
            })
            .is_ok()
    }

    /// Return one permit; saturates at zero so a release after a
    /// [`reset`](Self::reset) cannot underflow the counter
    pub fn release(&self) {
        let _ = self
            .running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |running| {
                Some(running.saturating_sub(1))
            });
    }

    /// Adjust the ceiling; permits already held are unaffected
    pub fn resize(&self, ceiling: usize) {
        let previous = self.ceiling.swap(ceiling, Ordering::AcqRel);
        if previous != ceiling {
            debug!(previous, ceiling, "ConcurrencyLimiter::resize: ceiling changed");
        }
    }

    /// Reset to a fresh pool: new ceiling, zero running
    pub fn reset(&self, ceiling: usize) {
        self.ceiling.store(ceiling, Ordering::Release);
        self.running.store(0, Ordering::Release);
    }

    /// Zero the running counter without touching the ceiling
    pub fn reset_running(&self) {
        self.running.store(0, Ordering::Release);
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling.load(Ordering::Acquire)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Permits currently available, `ceiling - running` floored at zero
    pub fn available(&self) -> usize {
        self.ceiling().saturating_sub(self.running())
    }
}
