/// Workspace Manager - scoped scratch directories
///
/// **Guarantees:**
/// - One uniquely named directory per request (`exec-<uuid v4>`), never shared
/// - Concurrent acquisition needs no locking: names are collision-resistant and
///   `create_dir` refuses to reuse an existing directory
/// - The tree is destroyed exactly once, either through `release` or on drop,
///   so every exit path (including panics and cancelled futures) cleans up
/// - Cleanup is best-effort: individual deletion failures are logged and
///   counted, never returned as errors
/// - Filesystem work on the request path goes through `tokio::fs` or the
///   blocking pool, never straight onto a runtime worker

use crate::error::{EngineError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

const WORKSPACE_PREFIX: &str = "exec-";

/// Creates per-request workspaces under an injected scratch root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a fresh workspace, creating the scratch root first if needed
    pub async fn acquire(&self) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| EngineError::Workspace {
                root: self.root.clone(),
                source,
            })?;

        let id = Uuid::new_v4().to_string();
        let dir = self.root.join(format!("{}{}", WORKSPACE_PREFIX, id));

        tokio::fs::create_dir(&dir)
            .await
            .map_err(|source| EngineError::Workspace {
                root: self.root.clone(),
                source,
            })?;

        debug!(workspace = %dir.display(), "Workspace acquired");
        Ok(Workspace {
            id,
            dir,
            released: false,
        })
    }
}

/// Outcome of tearing down a workspace tree
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// An exclusively owned scratch directory for one request
#[derive(Debug)]
pub struct Workspace {
    id: String,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write a file directly inside the workspace
    pub fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, contents).map_err(|source| EngineError::WriteSource {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Destroy the workspace now and report what happened
    pub fn release(mut self) -> CleanupReport {
        self.released = true;
        remove_tree(&self.dir)
    }

    /// `release` on the blocking pool. If that task dies the drop guard
    /// inside it has already run, so only the report is lost.
    pub async fn release_async(self) -> CleanupReport {
        match tokio::task::spawn_blocking(move || self.release()).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Workspace release task failed");
                CleanupReport {
                    removed: 0,
                    failed: 1,
                }
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            remove_tree(&self.dir);
        }
    }
}

fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

fn remove_tree(dir: &Path) -> CleanupReport {
    remove_tree_with(dir, remove_entry)
}

/// Delete a directory tree deepest entries first, continuing past failures
fn remove_tree_with<F>(dir: &Path, remove: F) -> CleanupReport
where
    F: Fn(&Path, bool) -> io::Result<()>,
{
    let mut report = CleanupReport::default();

    if !dir.exists() {
        return report;
    }

    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(workspace = %dir.display(), error = %e, "Failed to walk workspace entry");
                report.failed += 1;
                continue;
            }
        };

        match remove(entry.path(), entry.file_type().is_dir()) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to delete workspace entry");
                report.failed += 1;
            }
        }
    }

    if report.failed > 0 {
        warn!(
            workspace = %dir.display(),
            removed = report.removed,
            failed = report.failed,
            "Workspace cleanup incomplete"
        );
    } else {
        debug!(workspace = %dir.display(), removed = report.removed, "Workspace released");
    }

    report
}
