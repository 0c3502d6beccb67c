// src/payload/scratch.rs

//! Scratch directory cleanup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::FileSystem;

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// Directory that holds the payload files of a single run.
///
/// Every file directly inside it is assumed to belong to the run.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete every file in the directory.
    ///
    /// Per-file failures are logged and counted; they never stop the pass.
    /// A missing directory counts as already clean, so calling this twice is
    /// harmless.
    pub fn clean(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        if !self.fs.exists(&self.path) {
            debug!(dir = %self.path.display(), "scratch dir does not exist; nothing to clean");
            return report;
        }

        let entries = match self.fs.read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.path.display(), error = %e, "failed to list scratch dir");
                return report;
            }
        };

        for entry in entries {
            if !self.fs.is_file(&entry) {
                continue;
            }
            match self.fs.remove_file(&entry) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(file = %entry.display(), error = %e, "failed to remove payload file");
                    report.failed += 1;
                }
            }
        }

        info!(
            dir = %self.path.display(),
            removed = report.removed,
            failed = report.failed,
            "scratch dir cleaned"
        );
        report
    }

    /// Tie cleanup to a scope.
    pub fn guard(self) -> ScratchGuard {
        ScratchGuard {
            scratch: self,
            cleaned: false,
        }
    }
}

/// Runs [`ScratchDir::clean`] exactly once: either through [`finish`] or,
/// if that never happens, when the guard is dropped.
///
/// [`finish`]: ScratchGuard::finish
#[derive(Debug)]
pub struct ScratchGuard {
    scratch: ScratchDir,
    cleaned: bool,
}

impl ScratchGuard {
    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Clean now. Returns `None` if this guard already cleaned.
    pub fn finish(&mut self) -> Option<CleanupReport> {
        if self.cleaned {
            return None;
        }
        self.cleaned = true;
        Some(self.scratch.clean())
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.cleaned {
            debug!(dir = %self.scratch.path.display(), "scratch guard dropped before finish; cleaning");
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn clean_removes_files_and_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("scratch/a", "{}");
        fs.add_file("scratch/b", "{}");
        let scratch = ScratchDir::new(Arc::new(fs.clone()), "scratch");

        assert_eq!(scratch.clean(), CleanupReport { removed: 2, failed: 0 });
        assert_eq!(scratch.clean(), CleanupReport::default());
        assert_eq!(fs.file_count(), 0);
    }

    #[test]
    fn failed_removal_does_not_stop_cleanup() {
        let fs = MockFileSystem::new();
        fs.add_file("scratch/a", "{}");
        fs.add_file("scratch/b", "{}");
        fs.add_file("scratch/c", "{}");
        fs.lock_file("scratch/b");
        let scratch = ScratchDir::new(Arc::new(fs.clone()), "scratch");

        assert_eq!(scratch.clean(), CleanupReport { removed: 2, failed: 1 });
        assert_eq!(fs.file_count(), 1);
    }

    #[test]
    fn missing_dir_is_already_clean() {
        let scratch = ScratchDir::new(Arc::new(MockFileSystem::new()), "nowhere");
        assert_eq!(scratch.clean(), CleanupReport::default());
    }

    #[test]
    fn guard_cleans_once_on_drop() {
        let fs = MockFileSystem::new();
        fs.add_file("scratch/a", "{}");
        {
            let _guard = ScratchDir::new(Arc::new(fs.clone()), "scratch").guard();
        }
        assert_eq!(fs.file_count(), 0);

        fs.add_file("scratch/b", "{}");
        let mut guard = ScratchDir::new(Arc::new(fs.clone()), "scratch").guard();
        assert_eq!(guard.finish(), Some(CleanupReport { removed: 1, failed: 0 }));
        fs.add_file("scratch/c", "{}");
        assert_eq!(guard.finish(), None);
        drop(guard);
        // Second file survives: the guard already ran its single pass.
        assert_eq!(fs.file_count(), 1);
    }
}
