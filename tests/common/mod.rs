// Shared fixtures for the integration tests.
//
// Nothing here touches real system directories or spawns maintenance
// commands: the recording runner answers every command from a script, and
// the sandbox lays out a fake %TEMP% / %WINDIR% tree inside a TempDir.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use turbo_optimizer::command_runner::{CommandOutput, CommandRunner};
use turbo_optimizer::commands::SystemCommand;
use turbo_optimizer::system::{Elevation, SystemContext, SystemPaths};

enum Scripted {
    Output(CommandOutput),
    Missing,
}

/// Fake runner that records every command line and answers from a script.
///
/// Unscripted commands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    script: HashMap<String, Scripted>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `line` (the command's `display()`) with `output`.
    pub fn respond(mut self, line: &str, output: CommandOutput) -> Self {
        self.script.insert(line.to_string(), Scripted::Output(output));
        self
    }

    /// Answer `line` with stdout and exit code 0.
    pub fn respond_stdout(self, line: &str, stdout: &str) -> Self {
        let output = CommandOutput {
            stdout: stdout.to_string(),
            ..CommandOutput::succeeded()
        };
        self.respond(line, output)
    }

    /// Make `line` fail to spawn as if the program were not installed.
    pub fn missing(mut self, line: &str) -> Self {
        self.script.insert(line.to_string(), Scripted::Missing);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, line: &str) -> bool {
        self.calls().iter().any(|c| c == line)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &dyn SystemCommand) -> anyhow::Result<CommandOutput> {
        let line = command.display();
        self.calls.lock().unwrap().push(line.clone());

        match self.script.get(&line) {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::Missing) => Err(anyhow::Error::new(io::Error::from(
                io::ErrorKind::NotFound,
            ))
            .context(format!("Failed to spawn command: {}", line))),
            None => Ok(CommandOutput::succeeded()),
        }
    }
}

/// Fake host layout:
///
/// ```text
/// temp/                      a.tmp b.tmp
/// windows/Temp/              c.tmp cache/d.tmp
/// windows/Prefetch/          APP.PF other.pf Layout.ini
/// windows/SoftwareDistribution/Download/  kb1.cab pkg/e.bin
/// ```
pub struct Sandbox {
    pub dir: TempDir,
    pub paths: SystemPaths,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("temp");
        let windows = dir.path().join("windows");

        write_files(&temp, &["a.tmp", "b.tmp"]);
        write_files(&windows.join("Temp"), &["c.tmp"]);
        write_files(&windows.join("Temp").join("cache"), &["d.tmp"]);
        write_files(&windows.join("Prefetch"), &["APP.PF", "other.pf", "Layout.ini"]);
        let download = windows.join("SoftwareDistribution").join("Download");
        write_files(&download, &["kb1.cab"]);
        write_files(&download.join("pkg"), &["e.bin"]);

        let paths = SystemPaths {
            temp_dir: Some(temp),
            windows_dir: Some(windows),
        };
        Self { dir, paths }
    }

    pub fn temp(&self) -> &Path {
        self.paths.temp_dir.as_deref().unwrap()
    }

    pub fn windows(&self) -> &Path {
        self.paths.windows_dir.as_deref().unwrap()
    }

    pub fn entries(&self, dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }
}

pub fn write_files(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"data").unwrap();
    }
}

pub fn context(
    elevation: Elevation,
    paths: SystemPaths,
    dry_run: bool,
    runner: Arc<RecordingRunner>,
) -> SystemContext {
    SystemContext::new(elevation, paths, dry_run, runner)
}
