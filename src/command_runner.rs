//! External command execution.
//!
//! Maintenance units never call `std::process::Command` themselves. They hand
//! a typed [`SystemCommand`] to a [`CommandRunner`], which lets tests swap in a
//! recording fake and lets dry-run mode skip state-changing programs in one
//! place.
//!
//! [`ProcessRunner`] is the production runner:
//!
//! - Spawns the child isolated from terminal signals via `.in_new_process_group()`
//! - Registers the child PID with `ChildRegistry::global()` while it runs
//! - Captures stdout/stderr and the exit code

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::commands::SystemCommand;
use crate::process_guard::{ChildRegistry, CommandProcessGroup};

/// Executes typed external commands.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// A non-zero exit is **not** an error: it is reported through
    /// [`CommandOutput::success`]. `Err` means the program could not be
    /// spawned or waited on (for example, it does not exist).
    fn run(&self, command: &dyn SystemCommand) -> Result<CommandOutput>;
}

/// Output from an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The command was skipped by dry-run mode.
    pub dry_run: bool,
}

impl CommandOutput {
    /// A successful, empty output.
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            ..Self::default()
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
            ..Self::default()
        }
    }

    /// Output recorded for a command skipped in dry-run mode.
    pub fn skipped(command: &dyn SystemCommand) -> Self {
        Self {
            stdout: format!("[DRY RUN] Skipped: {}\n", command.display()),
            dry_run: true,
            ..Self::succeeded()
        }
    }

    /// Exit code for display, `-1` when killed by a signal.
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &dyn SystemCommand) -> Result<CommandOutput> {
        let line = command.display();

        if self.dry_run && !command.is_read_only() {
            info!("[DRY RUN] Skipped: {}", line);
            return Ok(CommandOutput::skipped(command));
        }

        info!("Running command: {}", line);
        let child = Command::new(command.program())
            .args(command.to_cli_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", line))?;
        let pid = child.id();

        ChildRegistry::register_global(pid);
        let waited = child
            .wait_with_output()
            .with_context(|| format!("Failed waiting for command: {}", line));
        ChildRegistry::unregister_global(pid);
        let output = waited?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
            dry_run: false,
        };

        if result.success {
            debug!("Command '{}' succeeded", line);
        } else {
            info!("Command '{}' failed with exit code {}", line, result.code());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{DismComponentCleanup, SfcVerifyOnly};

    /// A command guaranteed not to exist on any host.
    struct MissingProgram;

    impl SystemCommand for MissingProgram {
        fn program(&self) -> &'static str {
            "turbo-optimizer-definitely-missing-binary"
        }

        fn to_cli_args(&self) -> Vec<String> {
            vec!["--help".to_string()]
        }
    }

    #[test]
    fn test_dry_run_skips_state_changing_commands() {
        let runner = ProcessRunner::new(true);
        let output = runner.run(&DismComponentCleanup).unwrap();
        assert!(output.dry_run);
        assert!(output.success);
        assert!(output.stdout.contains("[DRY RUN] Skipped: dism"));
    }

    #[test]
    fn test_skipped_output_names_command() {
        let output = CommandOutput::skipped(&SfcVerifyOnly);
        assert!(output.dry_run);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "[DRY RUN] Skipped: sfc /verifyonly\n");
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let runner = ProcessRunner::new(false);
        let err = runner.run(&MissingProgram).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        assert!(format!("{}", err).contains("Failed to spawn command"));
    }
}
