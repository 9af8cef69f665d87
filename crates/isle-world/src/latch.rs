//! Phase barrier between the coordinator and its worker tasks.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often a waiting coordinator re-checks the cancel flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled,
    TimedOut,
}

/// Counts outstanding tasks of a phase; the coordinator waits for zero.
///
/// Tasks arrive through an [`Arrival`] guard, which also fires while a task
/// unwinds, so a failing task can never stall the barrier.
#[derive(Debug, Default)]
pub struct PhaseLatch {
    pending: Mutex<usize>,
    cleared: Condvar,
}

impl PhaseLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, parties: usize) {
        *self.pending.lock() += parties;
    }

    pub fn arrive(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.cleared.notify_all();
        }
    }

    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Guard that arrives when dropped
    pub fn arrival(self: &Arc<Self>) -> Arrival {
        Arrival {
            latch: Arc::clone(self),
        }
    }

    /// Wait for every registered party, giving up early once `cancel` is set
    pub fn wait(&self, cancel: &AtomicBool) -> WaitOutcome {
        let mut pending = self.pending.lock();
        loop {
            if *pending == 0 {
                return WaitOutcome::Completed;
            }
            if cancel.load(Ordering::Acquire) {
                return WaitOutcome::Cancelled;
            }
            self.cleared.wait_for(&mut pending, POLL_INTERVAL);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while *pending > 0 {
            if self.cleared.wait_until(&mut pending, deadline).timed_out() {
                return if *pending == 0 {
                    WaitOutcome::Completed
                } else {
                    WaitOutcome::TimedOut
                };
            }
        }
        WaitOutcome::Completed
    }
}

/// Arrives on its latch when dropped
#[derive(Debug)]
pub struct Arrival {
    latch: Arc<PhaseLatch>,
}

impl Drop for Arrival {
    fn drop(&mut self) {
        self.latch.arrive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_for_all_parties() {
        let latch = Arc::new(PhaseLatch::new());
        let cancel = AtomicBool::new(false);
        latch.register(4);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let arrival = latch.arrival();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5 * i));
                    drop(arrival);
                })
            })
            .collect();

        assert_eq!(latch.wait(&cancel), WaitOutcome::Completed);
        assert_eq!(latch.pending(), 0);
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_panicking_party_still_arrives() {
        let latch = Arc::new(PhaseLatch::new());
        latch.register(1);
        let arrival = latch.arrival();

        let result = thread::spawn(move || {
            let _arrival = arrival;
            panic!("task blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(latch.wait_timeout(Duration::from_secs(1)), WaitOutcome::Completed);
    }

    #[test]
    fn test_cancel_and_timeout() {
        let latch = PhaseLatch::new();
        latch.register(1);

        let cancel = AtomicBool::new(true);
        assert_eq!(latch.wait(&cancel), WaitOutcome::Cancelled);
        assert_eq!(
            latch.wait_timeout(Duration::from_millis(20)),
            WaitOutcome::TimedOut
        );

        latch.arrive();
        assert_eq!(latch.wait_timeout(Duration::from_millis(20)), WaitOutcome::Completed);
    }
}
