use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Run-scoped staging area.
///
/// Every run gets its own uniquely named directory under the staging root,
/// so concurrent runs sharing a root never touch each other's files. The
/// directory is removed when the workspace is dropped unless it was created
/// as kept.
pub struct RunWorkspace {
    root: PathBuf,
    guard: Option<TempDir>,
}

impl RunWorkspace {
    pub fn create(staging_root: &Path, keep: bool) -> Result<Self> {
        fs::create_dir_all(staging_root).with_context(|| {
            format!("creating staging root {}", staging_root.display())
        })?;

        let prefix = format!("run-{}-", chrono::Local::now().format("%Y%m%d-%H%M%S"));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(staging_root)
            .with_context(|| format!("creating run directory in {}", staging_root.display()))?;

        let (root, guard) = if keep {
            (dir.keep(), None)
        } else {
            (dir.path().to_path_buf(), Some(dir))
        };

        let workspace = Self {
            root,
            guard,
        };
        for sub in [workspace.raw_dir(), workspace.normalized_dir(), workspace.segments_dir()] {
            fs::create_dir_all(&sub)
                .with_context(|| format!("creating workspace directory {}", sub.display()))?;
        }
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_kept(&self) -> bool {
        self.guard.is_none()
    }

    /// Downloads as fetched from the provider
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn normalized_dir(&self) -> PathBuf {
        self.root.join("normalized")
    }

    /// Joined and trimmed per-segment clips
    pub fn segments_dir(&self) -> PathBuf {
        self.root.join("segments")
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
