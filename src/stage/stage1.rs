//! Stage 1: seed the staging root's rpm database.
//!
//! Packages from the bundle's stage 1 list (and their dependencies) are
//! downloaded and registered with `rpm --justdb`, so stage 2's real install
//! treats them as already present and only lays down the bundle's own
//! packages.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::process::Cmd;
use crate::target::ParamSet;
use crate::yum::YumInstaller;

/// Read a package list: whitespace-separated names or patterns, `#` starts
/// a comment.
pub fn read_package_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read package list {}", path.display()))?;

    let packages: Vec<String> = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect();

    if packages.is_empty() {
        bail!("package list {} is empty", path.display());
    }
    Ok(packages)
}

/// Build the stage 1 tree in `stage_dir`.
///
/// Returns false if any step fails; the directory is left for inspection.
pub fn make_stage1(
    stage_dir: &Path,
    installer: &YumInstaller,
    ps: ParamSet,
    package_list: &Path,
) -> Result<bool> {
    info!("Making stage 1 dir for {} in {}", ps, stage_dir.display());

    fs::create_dir_all(stage_dir)
        .with_context(|| format!("Failed to create {}", stage_dir.display()))?;

    let packages = match read_package_list(package_list) {
        Ok(packages) => packages,
        Err(e) => {
            error!("{:#}", e);
            return Ok(false);
        }
    };

    let code = Cmd::new("rpm")
        .arg("--initdb")
        .arg("--root")
        .arg_path(stage_dir)
        .run_status()?;
    if code != 0 {
        error!("rpm --initdb failed for {} (exit code {})", stage_dir.display(), code);
        return Ok(false);
    }

    info!("Resolving {} stage 1 packages", packages.len());
    let code = installer.resolve_only(stage_dir, &packages)?;
    if code != 0 {
        error!("Resolving stage 1 packages failed (exit code {})", code);
        return Ok(false);
    }

    Ok(true)
}
