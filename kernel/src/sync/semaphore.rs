//! Counting semaphore
//!
//! Used as the exit/wait rendezvous of a process record. `up` never
//! blocks; `down` spins through the thread service's `yield_now` until a
//! unit is available, so a signal posted before anyone waits is kept.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::thread::ThreadService;

/// Counting semaphore.
#[derive(Debug)]
pub struct Semaphore {
    count: AtomicUsize,
    waiters: AtomicUsize,
}

impl Semaphore {
    /// Create a semaphore holding `initial` units.
    pub const fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Release one unit.
    pub fn up(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Take one unit if available.
    pub fn try_down(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// Take one unit, yielding the CPU until one is available.
    pub fn down(&self, threads: &dyn ThreadService) {
        if self.try_down() {
            return;
        }

        if self.waiters.fetch_add(1, Ordering::AcqRel) > 0 {
            log::warn!("[KESTREL SYNC] second waiter on a single-waiter semaphore");
        }
        while !self.try_down() {
            threads.yield_now();
        }
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }

    /// Units currently available.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}
