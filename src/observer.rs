use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use crate::equity::SimulationResult;
use crate::stats::{Estimate, Tally};

/// Hooks into a running simulation. Called from worker threads, so
/// implementations must be `Sync`. All methods default to doing nothing.
pub trait SimulationObserver: Sync {
    /// A worker finished a batch, before it is merged. Parallel mode only.
    fn on_batch(&self, _worker: usize, _batch: &Tally) {}

    /// The stopping rule was evaluated against these running statistics.
    fn on_checkpoint(&self, _estimate: &Estimate) {}

    fn on_finish(&self, _result: &SimulationResult) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SimulationObserver for NoopObserver {}

/// Logs checkpoints and the final result at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn on_checkpoint(&self, estimate: &Estimate) {
        debug!(
            trials = estimate.trials,
            win_rate = estimate.win_rate,
            sigma = estimate.standard_deviation,
            half_width = estimate.half_width,
            "checkpoint"
        );
    }

    fn on_finish(&self, result: &SimulationResult) {
        debug!(
            trials = result.trials,
            wins = result.wins,
            win_rate = result.win_rate,
            "simulation finished"
        );
    }
}

/// Counts callbacks. Mostly useful in tests.
#[derive(Debug, Default)]
pub struct CountingObserver {
    batches: AtomicU64,
    batch_trials: AtomicU64,
    checkpoints: AtomicU64,
    finished: AtomicBool,
}

impl CountingObserver {
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Trials across every reported batch, including ones discarded after the
    /// stop.
    pub fn batch_trials(&self) -> u64 {
        self.batch_trials.load(Ordering::Relaxed)
    }

    pub fn checkpoints(&self) -> u64 {
        self.checkpoints.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl SimulationObserver for CountingObserver {
    fn on_batch(&self, _worker: usize, batch: &Tally) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.batch_trials.fetch_add(batch.trials, Ordering::Relaxed);
    }

    fn on_checkpoint(&self, _estimate: &Estimate) {
        self.checkpoints.fetch_add(1, Ordering::Relaxed);
    }

    fn on_finish(&self, _result: &SimulationResult) {
        self.finished.store(true, Ordering::Relaxed);
    }
}
