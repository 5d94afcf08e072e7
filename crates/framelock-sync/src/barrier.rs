use std::sync::{Condvar, Mutex};

use framelock_core::error::{ErrorKind, Result};

/// Reusable N-way countdown rendezvous.
///
/// Counting down to zero releases the barrier and, in the same critical
/// section, restores the countdown to its configured value, so a countdown
/// arriving right after a release always lands on the fresh cycle. A release
/// that happens while no thread is waiting is banked and satisfies the next
/// [`wait`](CyclicBarrier::wait) immediately; every release lets exactly one
/// waiter through. A lockstep session has a single waiter, the simulation
/// thread, and all peer queues count down.
#[derive(Debug)]
pub struct CyclicBarrier {
    count: usize,
    state: Mutex<BarrierState>,
    condvar: Condvar,
}

#[derive(Debug)]
struct BarrierState {
    remaining: usize,
    banked_releases: u64,
    cancelled: bool,
}

impl CyclicBarrier {
    /// Creates a barrier that releases after `count` countdowns per cycle.
    /// `count` must be at least one.
    pub fn new(count: usize) -> Self {
        debug_assert!(count > 0, "barrier needs at least one party");
        Self {
            count,
            state: Mutex::new(BarrierState {
                remaining: count,
                banked_releases: 0,
                cancelled: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until a release is available, then consumes it.
    ///
    /// Returns `Err(Interrupted)` once [`cancel`](CyclicBarrier::cancel) has
    /// been called and no release is pending.
    pub fn wait(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        loop {
            if state.banked_releases > 0 {
                state.banked_releases -= 1;
                return Ok(());
            }
            if state.cancelled {
                return Err(ErrorKind::Interrupted);
            }
            state = self.condvar.wait(state).map_err(poisoned)?;
        }
    }

    /// Decrements the countdown; reaching zero releases the barrier and
    /// restores the countdown. Calls while a release is in progress land on
    /// the fresh cycle; the countdown never goes negative.
    pub fn count_down(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.remaining > 0 {
                state.remaining -= 1;
                if state.remaining == 0 {
                    state.remaining = self.count;
                    state.banked_releases += 1;
                    self.condvar.notify_all();
                }
            }
        }
    }

    /// Force-restores the countdown without releasing. Used on desync
    /// recovery when partially counted cycles must be discarded.
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.remaining = self.count;
        }
    }

    /// Requests cancellation: wakes every waiter with `Interrupted` and makes
    /// all future waits fail once pending releases are consumed.
    pub fn cancel(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.cancelled = true;
            self.condvar.notify_all();
        }
    }

    /// Advisory view of the current countdown.
    pub fn count(&self) -> usize {
        self.state.lock().map(|state| state.remaining).unwrap_or(0)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ErrorKind {
    ErrorKind::Invariant("barrier mutex poisoned".to_owned())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn test_release_resets_countdown() {
        let barrier = CyclicBarrier::new(2);
        assert_eq!(barrier.count(), 2);
        barrier.count_down();
        assert_eq!(barrier.count(), 1);
        barrier.count_down();
        // Release and reset happen together; the fresh cycle is observable.
        assert_eq!(barrier.count(), 2);
        barrier.wait().unwrap();
    }

    #[test]
    fn test_wait_blocks_until_next_release() {
        let barrier = Arc::new(CyclicBarrier::new(2));
        barrier.count_down();
        barrier.count_down();
        barrier.wait().unwrap();

        // Second cycle: waiter must block until two more countdowns.
        let waiter = Arc::clone(&barrier);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        barrier.count_down();
        assert!(!handle.is_finished());
        barrier.count_down();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_release_before_wait_is_banked() {
        let barrier = CyclicBarrier::new(1);
        barrier.count_down();
        // Countdown completed while nobody waited; wait returns immediately.
        barrier.wait().unwrap();
    }

    #[test]
    fn test_reset_discards_partial_cycle() {
        let barrier = Arc::new(CyclicBarrier::new(3));
        barrier.count_down();
        barrier.count_down();
        assert_eq!(barrier.count(), 1);
        barrier.reset();
        assert_eq!(barrier.count(), 3);

        let waiter = Arc::clone(&barrier);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(50));
        // The two pre-reset countdowns must not leak into this cycle.
        barrier.count_down();
        assert!(!handle.is_finished());
        barrier.count_down();
        barrier.count_down();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_cancel_interrupts_waiter() {
        let barrier = Arc::new(CyclicBarrier::new(2));
        let waiter = Arc::clone(&barrier);
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(50));
        barrier.cancel();
        assert!(matches!(handle.join().unwrap(), Err(ErrorKind::Interrupted)));
        // Cancellation is sticky.
        assert!(matches!(barrier.wait(), Err(ErrorKind::Interrupted)));
    }

    #[test]
    fn test_extra_countdowns_do_not_overrelease() {
        let barrier = CyclicBarrier::new(2);
        for _ in 0..4 {
            barrier.count_down();
        }
        // Four countdowns across two cycles: exactly two releases.
        barrier.wait().unwrap();
        barrier.wait().unwrap();
        assert_eq!(barrier.count(), 2);
    }
}
