//! Selection sets.
//!
//! A [`Selection`] is the operator's opt-in subset of the registry for one
//! run: ordered, duplicate-free, validated against the registry size, and
//! immutable once built.

use std::collections::HashSet;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
}

impl Selection {
    /// Validate `indices` against a registry holding `registry_len` tasks.
    ///
    /// Order is kept as given. Repeated indices are dropped, the first
    /// occurrence wins.
    ///
    /// # Errors
    ///
    /// `InvalidSelection` when `indices` is empty or any index is out of range.
    pub fn new(indices: &[usize], registry_len: usize) -> Result<Self, EngineError> {
        if indices.is_empty() {
            return Err(EngineError::invalid_selection("no tasks selected"));
        }
        if let Some(bad) = indices.iter().find(|&&i| i >= registry_len) {
            return Err(EngineError::invalid_selection(format!(
                "task index {} is out of range (registry has {} tasks)",
                bad, registry_len
            )));
        }

        let mut seen = HashSet::with_capacity(indices.len());
        let deduped: Vec<usize> = indices.iter().copied().filter(|i| seen.insert(*i)).collect();
        if deduped.len() != indices.len() {
            tracing::debug!(
                "Dropped {} duplicate index(es) from selection",
                indices.len() - deduped.len()
            );
        }

        Ok(Self { indices: deduped })
    }

    /// Build a selection from per-task checkbox flags, in registry order.
    pub fn from_flags(flags: &[bool]) -> Result<Self, EngineError> {
        let indices: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, selected)| **selected)
            .map(|(i, _)| i)
            .collect();
        Self::new(&indices, flags.len())
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Never true: [`Selection::new`] rejects an empty request.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
