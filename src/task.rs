//! Task descriptors and the task unit contract.
//!
//! A descriptor is static metadata; a unit is the executable bound to it by
//! registry position.
//!
//! # Contract
//!
//! `TaskUnit::execute()` is total. Any fault met while doing the work (missing
//! permission, missing path, failed external command, unset environment
//! variable) is caught inside the unit and returned as an
//! [`Outcome`](crate::outcome::Outcome). The engine relies on this and has no
//! error channel for tasks.

use serde::Serialize;

use crate::outcome::Outcome;

/// Static metadata describing one maintenance operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    /// Display identifier, unique within the registry.
    pub name: String,
    pub description: String,
    /// Failure has real-world impact. Informational only; the engine ignores it.
    pub critical: bool,
    /// The unit may use internal concurrency for its own sub-steps.
    pub parallel_affinity: bool,
    /// Initial checkbox state offered to the operator.
    pub enabled_by_default: bool,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            critical: false,
            parallel_affinity: false,
            enabled_by_default: true,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn parallel(mut self, parallel_affinity: bool) -> Self {
        self.parallel_affinity = parallel_affinity;
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }
}

/// An executable maintenance operation.
///
/// Implementors must never panic and never block forever; everything that can
/// go wrong is reported through the returned outcome.
pub trait TaskUnit: Send + Sync {
    fn execute(&self) -> Outcome;
}

impl<F> TaskUnit for F
where
    F: Fn() -> Outcome + Send + Sync,
{
    fn execute(&self) -> Outcome {
        self()
    }
}
