// ==========================================
// Arrival Sequencer - periodic re-evaluation worker
// ==========================================
// One tokio task per airport: lock, re-evaluate, unlock, sleep.
// Catches drift that arrived without an explicit mutating call.
// Red line: cancellation is only observed between iterations; a pass
// in progress always runs to completion.
// Red line: a failed or panicking iteration is logged and the loop
// carries on with the next tick.
// ==========================================

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::SharedSequence;
use crate::engine::clock::Clock;
use crate::engine::error::SequenceResult;
use crate::engine::scheduler::ScheduleOutcome;

/// Iteration counters, shared with whoever spawned the worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    passes_completed: AtomicU64,
    passes_failed: AtomicU64,
}

impl WorkerStats {
    pub fn passes_completed(&self) -> u64 {
        self.passes_completed.load(Ordering::Relaxed)
    }

    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }
}

pub struct RescheduleWorker {
    airport: String,
    sequence: SharedSequence,
    clock: Arc<dyn Clock>,
    interval: Duration,
    stats: Arc<WorkerStats>,
}

impl RescheduleWorker {
    pub fn new(
        airport: impl Into<String>,
        sequence: SharedSequence,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            airport: airport.into(),
            sequence,
            clock,
            interval,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    pub fn airport(&self) -> &str {
        &self.airport
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// One iteration; the lock is held only for the duration of the pass.
    /// Time is read once the lock is held.
    pub async fn run_once(&self) -> SequenceResult<ScheduleOutcome> {
        let mut sequence = self.sequence.lock().await;
        let now = self.clock.now();
        sequence.reevaluate(now)
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            airport = %self.airport,
            interval_ms = self.interval.as_millis() as u64,
            "re-evaluation worker started"
        );

        while !cancel.is_cancelled() {
            match AssertUnwindSafe(self.run_once()).catch_unwind().await {
                Ok(Ok(outcome)) => {
                    self.stats.passes_completed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        airport = %self.airport,
                        scheduled = outcome.scheduled,
                        anchors = outcome.anchors,
                        "re-evaluation pass done"
                    );
                }
                Ok(Err(e)) => {
                    self.stats.passes_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(airport = %self.airport, "re-evaluation pass failed: {}", e);
                }
                Err(_) => {
                    self.stats.passes_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(airport = %self.airport, "re-evaluation pass panicked");
                }
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(airport = %self.airport, "re-evaluation worker stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
