//! Run reports.

use serde::Serialize;

use crate::outcome::Outcome;
use crate::run_state::RunPhase;

/// One selected task's result, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Registry index of the task.
    pub index: usize,
    pub task: String,
    pub critical: bool,
    pub outcome: Outcome,
}

impl ReportEntry {
    /// Rendered outcome text as shown to the operator.
    pub fn text(&self) -> &str {
        self.outcome.message()
    }
}

/// Final ordered report of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    /// Completion marker. A delivered report is always `Completed`.
    pub phase: RunPhase,
    /// Cancellation was requested and some tasks were never started.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(task, outcome text)` pairs in order.
    pub fn lines(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|e| (e.task.as_str(), e.text()))
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.task.as_str()).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Every entry succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn entry(&self, task: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.task == task)
    }
}
