//! Patch-directory overlays applied to the staging root.
//!
//! Each patch directory mirrors the staging tree. `*.patch` files are applied
//! with `patch -p1` from the staging root; everything else is copied over
//! the same relative path. Entries are visited in lexical order, and later
//! directories win over earlier ones.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::process::Cmd;

/// Apply `dirs` to `root` in the given order.
pub fn apply_patch_dirs(root: &Path, dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        info!("Applying patch dir {}", dir.display());
        apply_patch_dir(root, dir)
            .with_context(|| format!("Applying patch dir {}", dir.display()))?;
    }
    Ok(())
}

/// Apply a single patch directory.
pub fn apply_patch_dir(root: &Path, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("patch dir not found: {}", dir.display());
    }

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(dir)?;
        let dest = root.join(rel);
        let file_type = entry.file_type();

        // Parents are created as files land
        if file_type.is_dir() {
            continue;
        }
        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            remove_existing(&dest)?;
            symlink(&target, &dest).with_context(|| {
                format!("linking {} -> {}", dest.display(), target.display())
            })?;
        } else if entry.path().extension().is_some_and(|ext| ext == "patch") {
            apply_patch(root, entry.path())?;
        } else {
            remove_existing(&dest)?;
            fs::copy(entry.path(), &dest).with_context(|| {
                format!("copying {} to {}", entry.path().display(), dest.display())
            })?;
            debug!("overlaid {}", rel.display());
        }
    }

    Ok(())
}

/// Clear the way for a file or link at `dest`.
///
/// Links are removed rather than written through, so an overlay never
/// modifies whatever a staged symlink points at.
fn remove_existing(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => {
            bail!("{} is a directory in the staging root", dest.display())
        }
        Ok(_) => fs::remove_file(dest)
            .with_context(|| format!("removing {}", dest.display())),
        Err(_) => {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            Ok(())
        }
    }
}

fn apply_patch(root: &Path, patch: &Path) -> Result<()> {
    info!("Applying {}", patch.display());
    Cmd::new("patch")
        .args(["-p1", "--batch", "--silent", "-d"])
        .arg_path(root)
        .arg("-i")
        .arg_path(patch)
        .error_msg(format!("Applying {} failed", patch.display()))
        .run()?;
    Ok(())
}
