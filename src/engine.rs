//! Task execution engine.
//!
//! The engine accepts a selection of registry indices, validates it
//! synchronously, then hands the run to a single background worker thread.
//! The worker executes the selected units, records exactly one report entry
//! per task in selection order, emits a progress notification after each
//! entry, and returns the final [`Report`].
//!
//! # Guarantees
//!
//! - Empty or out-of-range selections are rejected with `InvalidSelection`
//!   before any unit runs.
//! - At most one run is active per engine; a second request while one is
//!   active fails with `RunInProgress`.
//! - Task failures never abort a run. Units report them as outcomes.
//! - Report entries and progress notifications follow selection order under
//!   every [`SchedulingPolicy`].
//! - Cancellation is cooperative and only observed between tasks. Tasks that
//!   were never started still get an entry (`Cancelled`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::outcome::Outcome;
use crate::registry::TaskRegistry;
use crate::report::{Report, ReportEntry};
use crate::run_state::{Progress, RunState};
use crate::selection::Selection;
use crate::task::{TaskDescriptor, TaskUnit};

/// Worker count used by the affinity policy unless configured otherwise.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// How the worker schedules the selected units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchedulingPolicy {
    /// One unit at a time, strictly in selection order.
    #[default]
    Sequential,
    /// Consecutive parallel-affine units run together on a bounded set of
    /// scoped workers; other units run alone.
    Affinity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub policy: SchedulingPolicy,
    /// Upper bound on concurrently executing units (affinity policy only).
    pub max_workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::Sequential,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Shared cancellation flag, polled by the worker before each task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Releases the engine's single run slot when the worker ends.
struct ActiveRunGuard(Arc<AtomicBool>);

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
        debug!("Run slot released");
    }
}

/// Orchestrates runs over a shared, read-only registry.
pub struct Engine {
    registry: Arc<TaskRegistry>,
    options: EngineOptions,
    active: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(registry: Arc<TaskRegistry>, options: EngineOptions) -> Self {
        Self {
            registry,
            options,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// True while a run's worker is alive.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a run over `indices` with a fresh cancellation token.
    pub fn request_run(&self, indices: &[usize]) -> Result<RunHandle, EngineError> {
        self.request_run_with_cancel(indices, CancelToken::new())
    }

    /// Start a run over `indices`, observing `cancel` between tasks.
    ///
    /// # Errors
    ///
    /// - `InvalidSelection` for an empty selection or an out-of-range index
    /// - `RunInProgress` if another run is active on this engine
    pub fn request_run_with_cancel(
        &self,
        indices: &[usize],
        cancel: CancelToken,
    ) -> Result<RunHandle, EngineError> {
        let selection = Selection::new(indices, self.registry.len())?;

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected run request: a run is already in progress");
            return Err(EngineError::RunInProgress);
        }
        let guard = ActiveRunGuard(Arc::clone(&self.active));

        let total = selection.len();
        let (progress_tx, progress_rx) = mpsc::channel();
        let worker = RunWorker {
            registry: Arc::clone(&self.registry),
            selection,
            options: self.options,
            cancel: cancel.clone(),
            progress_tx,
        };

        info!(
            "Starting run of {} task(s) with {} scheduling",
            total, self.options.policy
        );

        let worker = thread::Builder::new()
            .name("run-worker".to_string())
            .spawn(move || {
                let _guard = guard;
                worker.run()
            })
            .map_err(|e| EngineError::state(format!("failed to spawn run worker: {}", e)))?;

        Ok(RunHandle {
            progress_rx,
            worker,
            cancel,
            total,
        })
    }

    /// Run to completion on the calling thread's behalf, forwarding progress.
    pub fn run_blocking<F>(&self, indices: &[usize], mut on_progress: F) -> Result<Report, EngineError>
    where
        F: FnMut(&Progress),
    {
        let handle = self.request_run(indices)?;
        for progress in handle.progress() {
            on_progress(&progress);
        }
        handle.wait()
    }
}

/// Caller-side view of an active run.
pub struct RunHandle {
    progress_rx: Receiver<Progress>,
    worker: JoinHandle<Result<Report, EngineError>>,
    cancel: CancelToken,
    total: usize,
}

impl RunHandle {
    /// Number of tasks in the run.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Blocking iterator over progress notifications; ends with the run.
    pub fn progress(&self) -> impl Iterator<Item = Progress> + '_ {
        self.progress_rx.iter()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cooperative cancellation. The running task is not interrupted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and take the report.
    pub fn wait(self) -> Result<Report, EngineError> {
        self.worker.join().map_err(|_| EngineError::WorkerPanicked)?
    }
}

/// Everything one run's worker owns.
struct RunWorker {
    registry: Arc<TaskRegistry>,
    selection: Selection,
    options: EngineOptions,
    cancel: CancelToken,
    progress_tx: Sender<Progress>,
}

impl RunWorker {
    fn run(self) -> Result<Report, EngineError> {
        let mut state = RunState::new(self.selection.len());
        state.start()?;

        match self.options.policy {
            SchedulingPolicy::Sequential => self.run_sequential(&mut state)?,
            SchedulingPolicy::Affinity => self.run_affinity(&mut state)?,
        }

        let report = state.finish()?;
        info!(
            "Run completed in {} ms: {} succeeded, {} failed{}",
            report.elapsed_ms,
            report.succeeded(),
            report.failed(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn run_sequential(&self, state: &mut RunState) -> Result<(), EngineError> {
        for &index in self.selection.indices() {
            let outcome = if self.cancel.is_cancelled() {
                state.mark_cancelled();
                Outcome::cancelled()
            } else {
                let (descriptor, unit) = self.resolve(index)?;
                execute_unit(descriptor, unit)
            };
            self.record(state, index, outcome)?;
        }
        Ok(())
    }

    fn run_affinity(&self, state: &mut RunState) -> Result<(), EngineError> {
        let indices = self.selection.indices();
        let mut pos = 0;

        while pos < indices.len() {
            if self.cancel.is_cancelled() {
                state.mark_cancelled();
                for &index in &indices[pos..] {
                    self.record(state, index, Outcome::cancelled())?;
                }
                break;
            }

            let end = self.batch_end(indices, pos)?;
            if end - pos == 1 {
                let index = indices[pos];
                let (descriptor, unit) = self.resolve(index)?;
                let outcome = execute_unit(descriptor, unit);
                self.record(state, index, outcome)?;
            } else {
                self.run_batch(state, &indices[pos..end])?;
            }
            pos = end;
        }
        Ok(())
    }

    /// End (exclusive) of the batch starting at `start`.
    ///
    /// A non-affine task is a batch of one. Affine tasks group with their
    /// affine successors up to `max_workers`.
    fn batch_end(&self, indices: &[usize], start: usize) -> Result<usize, EngineError> {
        let max_workers = self.options.max_workers.max(1);
        let (first, _) = self.resolve(indices[start])?;
        if !first.parallel_affinity {
            return Ok(start + 1);
        }

        let mut end = start + 1;
        while end < indices.len() && end - start < max_workers {
            let (descriptor, _) = self.resolve(indices[end])?;
            if !descriptor.parallel_affinity {
                break;
            }
            end += 1;
        }
        Ok(end)
    }

    /// Execute `batch` concurrently and record its entries in batch order.
    fn run_batch(&self, state: &mut RunState, batch: &[usize]) -> Result<(), EngineError> {
        let resolved = batch
            .iter()
            .map(|&index| self.resolve(index))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Dispatching batch of {} parallel-affine task(s)", batch.len());

        let (tx, rx) = mpsc::channel::<(usize, Outcome)>();
        thread::scope(|scope| {
            for (slot, &(descriptor, unit)) in resolved.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let _ = tx.send((slot, execute_unit(descriptor, unit)));
                });
            }
            drop(tx);

            // Completion order is arbitrary; release the finished prefix only.
            let mut pending: Vec<Option<Outcome>> = batch.iter().map(|_| None).collect();
            let mut next = 0;
            for (slot, outcome) in rx {
                pending[slot] = Some(outcome);
                while let Some(outcome) = pending.get_mut(next).and_then(Option::take) {
                    self.record(state, batch[next], outcome)?;
                    next += 1;
                }
            }

            if next != batch.len() {
                return Err(EngineError::WorkerPanicked);
            }
            Ok(())
        })
    }

    fn resolve(&self, index: usize) -> Result<(&TaskDescriptor, &dyn TaskUnit), EngineError> {
        let descriptor = self.registry.descriptor(index);
        let unit = self.registry.unit_for(index);
        descriptor
            .zip(unit)
            .ok_or_else(|| EngineError::state(format!("no task registered at index {}", index)))
    }

    fn record(&self, state: &mut RunState, index: usize, outcome: Outcome) -> Result<(), EngineError> {
        let (descriptor, _) = self.resolve(index)?;
        let progress = state.record(ReportEntry {
            index,
            task: descriptor.name.clone(),
            critical: descriptor.critical,
            outcome,
        })?;

        debug!(
            "Progress {}/{}: {}",
            progress.completed, progress.total, progress.task
        );
        if self.progress_tx.send(progress).is_err() {
            debug!("Progress listener dropped; continuing run");
        }
        Ok(())
    }
}

fn execute_unit(descriptor: &TaskDescriptor, unit: &dyn TaskUnit) -> Outcome {
    info!("Executing task: {}", descriptor.name);
    let outcome = unit.execute();
    match outcome.failure_kind() {
        None => info!("Task '{}' finished: {}", descriptor.name, outcome),
        Some(kind) => warn!("Task '{}' reported {}: {}", descriptor.name, kind, outcome),
    }
    outcome
}
