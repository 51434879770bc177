//! Error handling module for the optimizer
//!
//! Two tiers exist. `EngineError` rejects a run request before any task
//! executes. Task-level faults never appear here: units convert them into an
//! [`Outcome`](crate::outcome::Outcome) and the report carries them.
//!
//! `OptimizerError` is the catch-all used by the binary-facing layers
//! (configuration, CLI plumbing).

use thiserror::Error;

/// Errors raised by the task registry and the execution engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The selection was empty or named an index outside the registry.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// A run is already active; concurrent runs are rejected, not queued.
    #[error("A run is already in progress")]
    RunInProgress,

    /// Two registered tasks share a display name.
    #[error("Duplicate task name in registry: {0}")]
    DuplicateTask(String),

    /// Internal run-state bookkeeping was violated.
    #[error("Run state error: {0}")]
    State(String),

    /// The background worker terminated without producing a report.
    #[error("Run worker terminated unexpectedly")]
    WorkerPanicked,
}

impl EngineError {
    /// Create an invalid selection error
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Create a run state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

/// Main error type for the optimizer
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// IO errors (config files, terminal output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors surfaced by the execution engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for optimizer operations
pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OptimizerError::config("max_workers must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: max_workers must be at least 1"
        );

        let err = EngineError::invalid_selection("selection is empty");
        assert_eq!(err.to_string(), "Invalid selection: selection is empty");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: OptimizerError = EngineError::RunInProgress.into();
        assert!(matches!(err, OptimizerError::Engine(EngineError::RunInProgress)));
        assert_eq!(err.to_string(), "A run is already in progress");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OptimizerError = io_err.into();
        assert!(matches!(err, OptimizerError::Io(_)));
    }
}
