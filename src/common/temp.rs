//! Utilities for managing staging directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A fresh staging tree for one build attempt.
///
/// The parent is a uniquely named directory (`stagedir-el6-x86_64-XXXXXX`);
/// the root is `<parent>/<dirname>`, the directory that ends up at the top of
/// the tarball. Nothing is removed on drop: a failed build leaves its tree
/// behind for inspection, and the driver calls [`StagingDir::remove`] when a
/// build succeeded and the tree is not being kept.
#[derive(Debug, Clone)]
pub struct StagingDir {
    parent: PathBuf,
    root: PathBuf,
}

impl StagingDir {
    /// Create a staging tree under `base`.
    pub fn create_in(base: &Path, prefix: &str, dirname: &str) -> Result<Self> {
        let parent = tempfile::Builder::new()
            .prefix(prefix)
            .disable_cleanup(true)
            .tempdir_in(base)
            .with_context(|| format!("Failed to create staging dir in {}", base.display()))?
            .path()
            .to_path_buf();
        let root = parent.join(dirname);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create {}", root.display()))?;
        Ok(Self { parent, root })
    }

    /// The directory packages are installed into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The uniquely named directory holding the root.
    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// Delete the whole tree. Best effort.
    pub fn remove(self) {
        cleanup_work_dir(&self.parent);
    }
}

/// Clean up a work directory after use.
///
/// Errors (including the directory already being gone) are ignored.
pub fn cleanup_work_dir(path: &Path) {
    let _ = fs::remove_dir_all(path);
}
