//! Process lifecycle management for child processes
//!
//! Maintenance commands (DISM, defrag, netsh) can outlive the optimizer if it
//! is killed while they run. This module keeps track of every spawned child
//! so they can be terminated when the process exits or is interrupted.
//!
//! # Solution
//! - Spawn children in their own process group, detached from terminal signals
//! - Track all child PIDs in a global registry
//! - First interrupt: cooperative cancellation (current task finishes)
//! - Second interrupt, or drop of [`ProcessGuard`]: terminate tracked children
//!
//! On Unix children get SIGTERM, then SIGKILL after a grace period. On Windows
//! the process tree is killed with `taskkill /T /F`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::engine::CancelToken;

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Exit status used when the operator interrupts twice (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Registry tracking all spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// Set of child PIDs currently running
    pids: HashSet<u32>,
    /// Whether cleanup has already been initiated (prevent double-cleanup)
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Register `pid` with the global registry.
    pub fn register_global(pid: u32) {
        match Self::global().lock() {
            Ok(mut registry) => registry.register(pid),
            Err(_) => tracing::warn!("Child registry poisoned; PID {} not tracked", pid),
        }
    }

    /// Unregister `pid` from the global registry.
    pub fn unregister_global(pid: u32) {
        if let Ok(mut registry) = Self::global().lock() {
            registry.unregister(pid);
        }
    }

    /// Register a new child process
    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    /// Get count of tracked children
    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child processes.
    ///
    /// Runs once per registry; later calls return immediately.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            tracing::debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            tracing::debug!("No child processes to terminate");
            return;
        }

        tracing::info!("Terminating {} child process(es)...", self.pids.len());
        let pids: Vec<u32> = self.pids.iter().copied().collect();
        platform::terminate(&pids, grace_period);

        self.pids.clear();
        tracing::info!("Child process cleanup complete");
    }
}

#[cfg(unix)]
mod platform {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;
    use std::time::{Duration, Instant};

    /// SIGTERM every process group, wait up to `grace_period`, then SIGKILL.
    pub(super) fn terminate(pids: &[u32], grace_period: Duration) {
        for &pid in pids {
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                tracing::warn!("Failed to send SIGTERM to process group {}: {}", pid, e);
                if let Err(e2) = send_signal(pid, Signal::SIGTERM) {
                    tracing::warn!("Failed to send SIGTERM to PID {}: {}", pid, e2);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                tracing::info!("All child processes terminated gracefully");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids {
            if is_process_alive(pid) {
                tracing::warn!("Process group {} did not terminate, sending SIGKILL", pid);
                if let Err(e) = send_signal_to_group(pid, Signal::SIGKILL) {
                    tracing::error!("Failed to send SIGKILL to process group {}: {}", pid, e);
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }
    }

    pub(super) fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
        signal::kill(Pid::from_raw(pid as i32), signal)
    }

    /// Negative PID addresses the whole process group.
    fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
        signal::kill(Pid::from_raw(-(pgid as i32)), signal)
    }

    /// Check if a process is still alive (not dead or zombie)
    pub(super) fn is_process_alive(pid: u32) -> bool {
        if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
            return false;
        }

        // Field 3 of /proc/pid/stat is the state; Z and X are not running
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            let fields: Vec<&str> = stat.split_whitespace().collect();
            if fields.len() > 2 {
                return !matches!(fields[2], "Z" | "X");
            }
        }

        true
    }
}

#[cfg(windows)]
mod platform {
    use std::process::{Command, Stdio};
    use std::time::Duration;

    pub(super) fn terminate(pids: &[u32], _grace_period: Duration) {
        for &pid in pids {
            let status = Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/T", "/F"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(s) if s.success() => tracing::debug!("Killed process tree {}", pid),
                Ok(s) => tracing::warn!("taskkill for PID {} exited with {}", pid, s),
                Err(e) => tracing::warn!("Failed to run taskkill for PID {}: {}", pid, e),
            }
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::time::Duration;

    pub(super) fn terminate(pids: &[u32], _grace_period: Duration) {
        tracing::warn!("Cannot terminate {} child process(es) on this platform", pids.len());
    }
}

/// RAII guard that terminates all children on drop.
/// Hold one in `main` so every exit path cleans up.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    /// Create a new process guard attached to the global registry
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }

    /// Get the number of tracked children
    pub fn child_count(&self) -> usize {
        self.registry.lock().map(|r| r.count()).unwrap_or(0)
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        tracing::debug!("ProcessGuard dropped, initiating cleanup");
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(Duration::from_secs(5));
        }
    }
}

/// Install the Ctrl+C / SIGTERM / SIGHUP handler for a run.
///
/// The first signal requests cooperative cancellation through `cancel`. Any
/// further signal terminates tracked children and exits with
/// [`INTERRUPTED_EXIT_CODE`]. Call this once per process.
pub fn init_interrupt_handler(cancel: CancelToken) -> Result<(), ctrlc::Error> {
    let received = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if received.fetch_add(1, Ordering::SeqCst) == 0 {
            tracing::warn!("Interrupt received: finishing current task, skipping the rest");
            cancel.cancel();
            return;
        }

        tracing::warn!("Second interrupt received, terminating child processes");
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.terminate_all(Duration::from_secs(3));
        }
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
}

/// Extension trait for std::process::Command to isolate children
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

#[cfg(unix)]
impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe functions.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(nix::unistd::Pid::from_raw(0), nix::unistd::Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                // Child dies with the parent instead of being orphaned
                #[cfg(target_os = "linux")]
                if nix::libc::prctl(nix::libc::PR_SET_PDEATHSIG, nix::libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

#[cfg(windows)]
impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        self.creation_flags(CREATE_NEW_PROCESS_GROUP)
    }
}

#[cfg(not(any(unix, windows)))]
impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        self
    }
}
