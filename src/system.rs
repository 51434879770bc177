//! Host environment detection.
//!
//! Everything a maintenance unit needs to know about the machine is captured
//! once at startup into a [`SystemContext`] and handed to each unit when the
//! registry is built. Units never read process-wide state on their own, so
//! tests can build elevated and non-elevated contexts side by side.
//!
//! # Design
//!
//! - **Detect once**: elevation and well-known paths are read at startup
//! - **Safe defaults**: ambiguous elevation detection yields `Standard`
//! - **Explicit absence**: unset environment variables stay `None` so units
//!   can report them instead of guessing a path

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::command_runner::{CommandRunner, ProcessRunner};

/// Whether the process holds administrator rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elevation {
    /// Running as Administrator (Windows) or root (Unix)
    Elevated,
    /// Ordinary user rights
    Standard,
}

impl Elevation {
    /// Detect the elevation of the current process.
    ///
    /// Never panics; detection failures yield `Standard`.
    pub fn detect() -> Self {
        let elevation = if detect_elevated() {
            Self::Elevated
        } else {
            Self::Standard
        };
        tracing::info!("Elevation detected: {}", elevation);
        elevation
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Elevated)
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated => write!(f, "elevated"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

#[cfg(unix)]
fn detect_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Opening the raw physical drive only succeeds with administrator rights.
#[cfg(windows)]
fn detect_elevated() -> bool {
    std::fs::File::open(r"\\.\PHYSICALDRIVE0").is_ok()
}

#[cfg(not(any(unix, windows)))]
fn detect_elevated() -> bool {
    false
}

/// Well-known locations the maintenance units operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemPaths {
    /// `%TEMP%`
    pub temp_dir: Option<PathBuf>,
    /// `%WINDIR%`
    pub windows_dir: Option<PathBuf>,
}

impl SystemPaths {
    /// Read `TEMP` and `WINDIR` from the environment. Empty values count as unset.
    pub fn from_env() -> Self {
        let read = |key: &str| env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let paths = Self {
            temp_dir: read("TEMP"),
            windows_dir: read("WINDIR"),
        };
        tracing::debug!("System paths: {:?}", paths);
        paths
    }

    /// `%WINDIR%\Temp`
    pub fn windows_temp_dir(&self) -> Option<PathBuf> {
        self.windows_dir.as_ref().map(|w| w.join("Temp"))
    }

    /// `%WINDIR%\Prefetch`
    pub fn prefetch_dir(&self) -> Option<PathBuf> {
        self.windows_dir.as_ref().map(|w| w.join("Prefetch"))
    }

    /// `%WINDIR%\SoftwareDistribution\Download`
    pub fn update_download_dir(&self) -> Option<PathBuf> {
        self.windows_dir
            .as_ref()
            .map(|w| w.join("SoftwareDistribution").join("Download"))
    }
}

/// Capabilities and environment shared by every maintenance unit.
#[derive(Clone)]
pub struct SystemContext {
    pub elevation: Elevation,
    pub paths: SystemPaths,
    /// Count instead of delete, and skip state-changing commands.
    pub dry_run: bool,
    pub runner: Arc<dyn CommandRunner>,
}

impl SystemContext {
    /// Detect the live environment and spawn real processes.
    pub fn detect(dry_run: bool) -> Self {
        Self {
            elevation: Elevation::detect(),
            paths: SystemPaths::from_env(),
            dry_run,
            runner: Arc::new(ProcessRunner::new(dry_run)),
        }
    }

    /// Build a context from explicit parts.
    pub fn new(
        elevation: Elevation,
        paths: SystemPaths,
        dry_run: bool,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            elevation,
            paths,
            dry_run,
            runner,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.elevation.is_elevated()
    }
}

impl fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("elevation", &self.elevation)
            .field("paths", &self.paths)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_elevation_display() {
        assert_eq!(Elevation::Elevated.to_string(), "elevated");
        assert_eq!(Elevation::Standard.to_string(), "standard");
    }

    #[test]
    fn test_elevation_predicates() {
        assert!(Elevation::Elevated.is_elevated());
        assert!(!Elevation::Standard.is_elevated());
    }

    #[test]
    fn test_detect_renders_known_label() {
        let elevation = Elevation::detect();
        let expected = if elevation.is_elevated() { "elevated" } else { "standard" };
        assert_eq!(elevation.to_string(), expected);
    }

    #[test]
    fn test_derived_paths() {
        let paths = SystemPaths {
            temp_dir: None,
            windows_dir: Some(PathBuf::from("/win")),
        };
        assert_eq!(paths.windows_temp_dir().unwrap(), Path::new("/win").join("Temp"));
        assert_eq!(paths.prefetch_dir().unwrap(), Path::new("/win").join("Prefetch"));
        assert_eq!(
            paths.update_download_dir().unwrap(),
            Path::new("/win").join("SoftwareDistribution").join("Download")
        );
    }

    #[test]
    fn test_missing_windows_dir_yields_none() {
        let paths = SystemPaths::default();
        assert!(paths.windows_temp_dir().is_none());
        assert!(paths.prefetch_dir().is_none());
        assert!(paths.update_download_dir().is_none());
    }
}
