//! Directory purges: temp roots, Prefetch and the Windows Update download cache.
//!
//! Only the top-level entries of a directory are visited; directory entries
//! are removed recursively. Entries that cannot be removed are counted as
//! skipped rather than failing the whole purge. In dry-run mode matching
//! entries are counted and left in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use crate::outcome::{FailureKind, Outcome};
use crate::system::SystemContext;
use crate::task::TaskUnit;

/// Text for a Prefetch directory the process may not read.
pub const PREFETCH_ACCESS_DENIED: &str =
    "No se puede acceder a Prefetch: se requieren privilegios de administrador";

/// Counters for one purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub removed: usize,
    pub skipped: usize,
}

impl PurgeStats {
    /// `base` followed by `" ({skipped} omitidos)"` when anything was skipped.
    pub fn describe(&self, base: impl Into<String>) -> String {
        let mut text = base.into();
        if self.skipped > 0 {
            text.push_str(&format!(" ({} omitidos)", self.skipped));
        }
        text
    }

    pub fn merge(self, other: PurgeStats) -> PurgeStats {
        PurgeStats {
            removed: self.removed + other.removed,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Remove every top-level entry of `dir` accepted by `filter`.
///
/// # Errors
///
/// Only when `dir` itself cannot be listed. Per-entry faults are counted in
/// [`PurgeStats::skipped`].
pub fn purge_dir<F>(dir: &Path, dry_run: bool, filter: F) -> io::Result<PurgeStats>
where
    F: Fn(&Path) -> bool,
{
    let mut stats = PurgeStats::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Unreadable entry in {}: {}", dir.display(), e);
                stats.skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        if !filter(&path) {
            continue;
        }
        if dry_run {
            stats.removed += 1;
            continue;
        }

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match removed {
            Ok(()) => stats.removed += 1,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                stats.skipped += 1;
            }
        }
    }

    tracing::debug!(
        "Purged {}: {} removed, {} skipped",
        dir.display(),
        stats.removed,
        stats.skipped
    );
    Ok(stats)
}

fn is_prefetch_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pf"))
}

fn missing_windir() -> Outcome {
    Outcome::failure(FailureKind::MissingEnvironment, "Variable WINDIR no definida")
}

// ============================================================================
// Temp files
// ============================================================================

/// Purges `%TEMP%` and `%WINDIR%\Temp`, one thread per root.
#[derive(Debug, Clone)]
pub struct TempPurge {
    ctx: SystemContext,
}

impl TempPurge {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(2);
        for root in [self.ctx.paths.temp_dir.clone(), self.ctx.paths.windows_temp_dir()]
            .into_iter()
            .flatten()
        {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }
}

impl TaskUnit for TempPurge {
    fn execute(&self) -> Outcome {
        let roots = self.roots();
        if roots.is_empty() {
            return Outcome::failure(
                FailureKind::MissingEnvironment,
                "Variables TEMP y WINDIR no definidas",
            );
        }

        let dry_run = self.ctx.dry_run;
        let results: Vec<io::Result<PurgeStats>> = thread::scope(|s| {
            let handles: Vec<_> = roots
                .iter()
                .map(|root| s.spawn(move || purge_dir(root, dry_run, |_| true)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(io::Error::other("purge thread panicked")))
                })
                .collect()
        });

        let mut total = PurgeStats::default();
        let mut first_error = None;
        let mut unreadable = 0;
        for (root, result) in roots.iter().zip(results) {
            match result {
                Ok(stats) => total = total.merge(stats),
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", root.display(), e);
                    unreadable += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if unreadable == roots.len() {
            if let Some(err) = first_error {
                return Outcome::from_io_error("", &err);
            }
        }

        let mut text = total.describe(format!("{} elementos purgados", total.removed));
        if unreadable > 0 {
            text.push_str(&format!("; {} ubicación(es) inaccesible(s)", unreadable));
        }
        Outcome::success(text)
    }
}

// ============================================================================
// Prefetch
// ============================================================================

/// Removes `*.pf` trace files from `%WINDIR%\Prefetch`.
#[derive(Debug, Clone)]
pub struct PrefetchPurge {
    ctx: SystemContext,
}

impl PrefetchPurge {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

impl TaskUnit for PrefetchPurge {
    fn execute(&self) -> Outcome {
        let Some(dir) = self.ctx.paths.prefetch_dir() else {
            return missing_windir();
        };

        match purge_dir(&dir, self.ctx.dry_run, is_prefetch_file) {
            Ok(stats) if stats.removed == 0 && stats.skipped > 0 => Outcome::failure(
                FailureKind::PermissionDenied,
                stats.describe(PREFETCH_ACCESS_DENIED),
            ),
            Ok(stats) => {
                Outcome::success(stats.describe(format!("Prefetch vaciado ({})", stats.removed)))
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Outcome::failure(FailureKind::PermissionDenied, PREFETCH_ACCESS_DENIED)
            }
            Err(e) => Outcome::from_io_error("No se puede acceder a Prefetch", &e),
        }
    }
}

// ============================================================================
// Windows Update cache
// ============================================================================

/// Empties `%WINDIR%\SoftwareDistribution\Download`.
#[derive(Debug, Clone)]
pub struct UpdateCachePurge {
    ctx: SystemContext,
}

impl UpdateCachePurge {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

impl TaskUnit for UpdateCachePurge {
    fn execute(&self) -> Outcome {
        let Some(dir) = self.ctx.paths.update_download_dir() else {
            return missing_windir();
        };

        match purge_dir(&dir, self.ctx.dry_run, |_| true) {
            Ok(stats) => Outcome::success(
                stats.describe(format!("Cache Update limpiada ({})", stats.removed)),
            ),
            // Nothing downloaded yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Outcome::success("Cache Update limpiada (0)")
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Outcome::access_denied(),
            Err(e) => Outcome::from_io_error("No se puede acceder a la caché de Update", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &Path, files: &[&str]) {
        for f in files {
            fs::write(dir.join(f), b"x").unwrap();
        }
    }

    #[test]
    fn test_purge_dir_removes_files_and_trees() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), &["a.tmp", "b.log"]);
        let nested = tmp.path().join("nested");
        fs::create_dir_all(nested.join("deeper")).unwrap();
        populate(&nested.join("deeper"), &["c.tmp"]);

        let stats = purge_dir(tmp.path(), false, |_| true).unwrap();
        assert_eq!(stats, PurgeStats { removed: 3, skipped: 0 });
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_purge_dir_dry_run_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), &["a.tmp", "b.tmp"]);

        let stats = purge_dir(tmp.path(), true, |_| true).unwrap();
        assert_eq!(stats.removed, 2);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_purge_dir_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = purge_dir(&tmp.path().join("absent"), false, |_| true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_prefetch_filter_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), &["APP.PF", "other.pf", "layout.ini"]);

        let stats = purge_dir(tmp.path(), false, is_prefetch_file).unwrap();
        assert_eq!(stats.removed, 2);
        assert!(tmp.path().join("layout.ini").exists());
    }

    #[test]
    fn test_describe_appends_skip_count() {
        let clean = PurgeStats { removed: 4, skipped: 0 };
        assert_eq!(clean.describe("Prefetch vaciado (4)"), "Prefetch vaciado (4)");

        let partial = PurgeStats { removed: 1, skipped: 3 };
        assert_eq!(
            partial.describe("Cache Update limpiada (1)"),
            "Cache Update limpiada (1) (3 omitidos)"
        );
    }

    #[test]
    fn test_merge_stats() {
        let a = PurgeStats { removed: 2, skipped: 1 };
        let b = PurgeStats { removed: 3, skipped: 0 };
        assert_eq!(a.merge(b), PurgeStats { removed: 5, skipped: 1 });
    }
}
