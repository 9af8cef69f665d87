//! Fixed-size worker pool that fans a phase out into one task per index.

use crate::latch::{PhaseLatch, WaitOutcome};
use isle_core::{Error, Phase, Result, Statistics, TaskFailure};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Timing and failure count of one fanned-out phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseReport {
    pub phase: Phase,
    pub cycle: u64,
    pub tasks: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

/// Cloneable handle that asks a running simulation to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    latch: Arc<PhaseLatch>,
    cancel: Arc<AtomicBool>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config("worker pool needs at least one worker".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("isle-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to start worker pool: {}", e)))?;

        Ok(Self {
            pool,
            latch: Arc::new(PhaseLatch::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.cancel),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Run `task(index, cancel)` for every index in `0..tasks` and wait for all of them.
    ///
    /// A task that errors or panics is logged and recorded in `stats`; the
    /// phase still completes. Returns `Error::Cancelled` when shutdown was
    /// requested before every task arrived.
    pub fn fan_out<F>(
        &self,
        phase: Phase,
        cycle: u64,
        tasks: usize,
        stats: &Arc<Statistics>,
        task: F,
    ) -> Result<PhaseReport>
    where
        F: Fn(usize, &AtomicBool) -> Result<()> + Send + Sync + 'static,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled(format!("{} phase of cycle {}", phase, cycle)));
        }

        let started = Instant::now();
        let task = Arc::new(task);
        let failed = Arc::new(AtomicUsize::new(0));
        self.latch.register(tasks);

        for index in 0..tasks {
            let arrival = self.latch.arrival();
            let task = Arc::clone(&task);
            let cancel = Arc::clone(&self.cancel);
            let stats = Arc::clone(stats);
            let failed = Arc::clone(&failed);

            self.pool.spawn(move || {
                let _arrival = arrival;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*task)(index, &cancel)));
                let message = match outcome {
                    Ok(Ok(())) => return,
                    Ok(Err(e)) => e.to_string(),
                    Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
                };

                error!(
                    event = "task_failed",
                    phase = %phase,
                    cycle = cycle,
                    index = index,
                    error = %message,
                    "Worker task failed"
                );
                failed.fetch_add(1, Ordering::Relaxed);
                stats.record_task_failure(TaskFailure {
                    phase,
                    cycle,
                    index,
                    message,
                });
            });
        }

        match self.latch.wait(&self.cancel) {
            WaitOutcome::Completed => {}
            WaitOutcome::Cancelled | WaitOutcome::TimedOut => {
                warn!(
                    phase = %phase,
                    cycle = cycle,
                    pending = self.latch.pending(),
                    "Phase interrupted by shutdown"
                );
                return Err(Error::Cancelled(format!("{} phase of cycle {}", phase, cycle)));
            }
        }

        let report = PhaseReport {
            phase,
            cycle,
            tasks,
            failures: failed.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };
        debug!(
            phase = %phase,
            cycle = cycle,
            tasks = tasks,
            failures = report.failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Phase complete"
        );
        Ok(report)
    }

    /// Stop accepting work and wait up to `grace` for in-flight tasks.
    ///
    /// Returns false when tasks were still running at the deadline; they are
    /// told to cancel and the pool is released without waiting further.
    pub fn shutdown(self, grace: Duration) -> bool {
        self.cancel.store(true, Ordering::Release);
        let drained = self.latch.wait_timeout(grace) == WaitOutcome::Completed;
        if !drained {
            warn!(
                pending = self.latch.pending(),
                grace_ms = grace.as_millis() as u64,
                "Workers still busy after grace period, abandoning them"
            );
        }
        drained
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("pending", &self.latch.pending())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
