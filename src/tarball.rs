//! Tarball creation and inspection.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::process::Cmd;

/// Archive `stage_dir` into a gzip-compressed tarball.
///
/// The archive holds a single top-level directory named after the staging
/// root. Permissions are preserved and ownership is stored numerically.
pub fn create_tarball(stage_dir: &Path, tarball: &Path) -> Result<()> {
    let parent = stage_dir
        .parent()
        .with_context(|| format!("{} has no parent directory", stage_dir.display()))?;
    let dirname = stage_dir
        .file_name()
        .with_context(|| format!("{} has no directory name", stage_dir.display()))?;

    let tarball = absolute(tarball)?;
    if let Some(out_dir) = tarball.parent() {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    info!("Creating tarball {}", tarball.display());
    let code = Cmd::new("tar")
        .arg("-C")
        .arg_path(parent)
        .args(["--numeric-owner", "-czpf"])
        .arg_path(&tarball)
        .arg_path(Path::new(dirname))
        .run_status()?;
    if code != 0 {
        bail!("tar failed for {} (exit code {})", tarball.display(), code);
    }

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path))
    }
}

/// Number of entries in a gzip-compressed tarball.
pub fn count_entries(tarball: &Path) -> Result<usize> {
    let result = Cmd::new("tar")
        .arg("-tzf")
        .arg_path(tarball)
        .error_msg(format!("Listing {} failed", tarball.display()))
        .run()?;
    Ok(result.stdout.lines().filter(|l| !l.is_empty()).count())
}

/// Hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// What was written for one successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TarballInfo {
    pub path: PathBuf,
    pub size: u64,
    /// None if the archive could not be listed.
    pub file_count: Option<usize>,
    pub sha256: String,
}

impl TarballInfo {
    /// Stat, list and hash a finished tarball.
    pub fn inspect(path: &Path) -> Result<Self> {
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        let file_count = match count_entries(path) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("error getting file count: {:#}", e);
                None
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            size,
            file_count,
            sha256: sha256_file(path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_inspect() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("stagedir-el6-x86_64-abc/osg-wn-client");
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin/tool"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(root.join("bin/tool"), fs::Permissions::from_mode(0o750))
            .unwrap();
        fs::write(root.join("README"), "hi\n").unwrap();

        let tarball = tmp.path().join("out/osg-wn-client.tar.gz");
        create_tarball(&root, &tarball).unwrap();

        let info = TarballInfo::inspect(&tarball).unwrap();
        assert!(info.size > 0);
        // osg-wn-client/, bin/, bin/tool, README
        assert_eq!(info.file_count, Some(4));
        assert_eq!(info.sha256.len(), 64);

        let listing = Cmd::new("tar").arg("-tvzf").arg_path(&tarball).run().unwrap();
        assert!(listing.stdout.contains("osg-wn-client/bin/tool"));
        assert!(listing.stdout.contains("rwxr-x---"));
    }

    #[test]
    fn test_sha256_known_value() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_inspect_unlistable_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not-a-tarball.tar.gz");
        fs::write(&path, "plain text").unwrap();

        let info = TarballInfo::inspect(&path).unwrap();
        assert_eq!(info.size, 10);
        assert_eq!(info.file_count, None);
    }

    #[test]
    fn test_missing_stage_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let err = create_tarball(&tmp.path().join("gone/root"), &tmp.path().join("x.tar.gz"));
        assert!(err.is_err());
    }
}
