//! Run State Machine
//!
//! Tracks the progress of exactly one in-flight run and enforces its
//! invariants: entries are recorded while `Running` only, the completed count
//! advances by exactly one per entry and never exceeds the selection size, and
//! `Completed` is reached only once every selected task has an entry.
//!
//! # Phase Flow
//!
//! ```text
//! Idle
//!   ↓  start()        (non-empty selection)
//! Running
//!   ↓  finish()       (after the last entry, unconditionally)
//! Completed
//! ```
//!
//! There is no failed phase: failure is task-local and lives in the entries.

use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::error::EngineError;
use crate::outcome::Outcome;
use crate::report::{Report, ReportEntry};

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
}

impl RunPhase {
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Running),
            Self::Running => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Progress notification emitted after each recorded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Entries recorded so far (1-based after the first task).
    pub completed: usize,
    pub total: usize,
    /// Name of the task whose entry was just recorded.
    pub task: String,
    pub outcome: Outcome,
}

impl Progress {
    pub fn is_final(&self) -> bool {
        self.completed == self.total
    }

    /// Completion ratio in percent (0-100).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// Mutable progress and report state of one run.
///
/// Owned by the run worker; nothing else mutates it.
#[derive(Debug)]
pub struct RunState {
    phase: RunPhase,
    total: usize,
    entries: Vec<ReportEntry>,
    cancelled: bool,
    started_at: Option<Instant>,
}

impl RunState {
    /// Create an idle state for a selection of `total` tasks.
    pub fn new(total: usize) -> Self {
        Self {
            phase: RunPhase::Idle,
            total,
            entries: Vec::with_capacity(total),
            cancelled: false,
            started_at: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// `Idle → Running`.
    ///
    /// # Errors
    ///
    /// `InvalidSelection` for an empty run, `State` if not idle.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.phase != RunPhase::Idle {
            return Err(EngineError::state(format!(
                "cannot start a run that is {}",
                self.phase
            )));
        }
        if self.total == 0 {
            return Err(EngineError::invalid_selection("no tasks selected"));
        }
        self.phase = RunPhase::Running;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Record one task's entry and return the resulting progress notification.
    ///
    /// # Errors
    ///
    /// `State` if the run is not running or every task already has an entry.
    pub fn record(&mut self, entry: ReportEntry) -> Result<Progress, EngineError> {
        if self.phase != RunPhase::Running {
            return Err(EngineError::state(format!(
                "cannot record '{}' while {}",
                entry.task, self.phase
            )));
        }
        if self.entries.len() >= self.total {
            return Err(EngineError::state(format!(
                "all {} entries already recorded, refusing '{}'",
                self.total, entry.task
            )));
        }

        let progress = Progress {
            completed: self.entries.len() + 1,
            total: self.total,
            task: entry.task.clone(),
            outcome: entry.outcome.clone(),
        };
        self.entries.push(entry);
        Ok(progress)
    }

    /// Flag that cancellation was observed during this run.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// `Running → Completed`, consuming the state into the final report.
    ///
    /// # Errors
    ///
    /// `State` if not running or if any selected task lacks an entry.
    pub fn finish(mut self) -> Result<Report, EngineError> {
        if self.phase != RunPhase::Running {
            return Err(EngineError::state(format!(
                "cannot finish a run that is {}",
                self.phase
            )));
        }
        if self.entries.len() != self.total {
            return Err(EngineError::state(format!(
                "run finished with {} of {} entries",
                self.entries.len(),
                self.total
            )));
        }

        self.phase = RunPhase::Completed;
        let elapsed_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        Ok(Report {
            entries: self.entries,
            phase: self.phase,
            cancelled: self.cancelled,
            elapsed_ms,
        })
    }
}
