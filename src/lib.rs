//! Windows Turbo Optimizer Library
//!
//! A catalog of system maintenance tasks and an engine that runs a selection
//! of them in the background, reporting one outcome per task.

pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod process_guard;
pub mod registry;
pub mod report;
pub mod run_state;
pub mod selection;
pub mod system;
pub mod task;
pub mod tasks;

// Re-export main types for convenience
pub use command_runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use commands::SystemCommand;
pub use config::OptimizerConfig;
pub use engine::{CancelToken, Engine, EngineOptions, RunHandle, SchedulingPolicy};
pub use error::{EngineError, OptimizerError};
pub use outcome::{FailureKind, Outcome};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use registry::TaskRegistry;
pub use report::{Report, ReportEntry};
pub use run_state::{Progress, RunPhase};
pub use selection::Selection;
pub use system::{Elevation, SystemContext, SystemPaths};
pub use task::{TaskDescriptor, TaskUnit};
pub use tasks::default_registry;
