//! Stage 2: real install, overlays, post-install scripts, archive.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::overlay::apply_patch_dirs;
use super::post_install::run_post_scripts;
use crate::tarball;
use crate::target::ParamSet;
use crate::yum::YumInstaller;

/// Everything stage 2 needs for one build.
pub struct Stage2Request<'a> {
    /// Staging root, already seeded by stage 1.
    pub stage_dir: &'a Path,
    pub packages: &'a [String],
    /// Where the tarball is written.
    pub tarball: &'a Path,
    /// Applied in order; later directories win.
    pub patch_dirs: &'a [PathBuf],
    pub post_scripts_dir: &'a Path,
    pub installer: &'a YumInstaller,
    pub param_set: ParamSet,
    pub relnum: &'a str,
}

/// Run stage 2. Returns false at the first failing step, leaving the
/// staging root in place.
pub fn make_stage2(req: &Stage2Request<'_>) -> Result<bool> {
    info!("Installing {}", req.packages.join(" "));
    let code = req.installer.install(req.stage_dir, req.packages)?;
    if code != 0 {
        error!("yum install failed (exit code {})", code);
        return Ok(false);
    }

    if let Err(e) = apply_patch_dirs(req.stage_dir, req.patch_dirs) {
        error!("{:#}", e);
        return Ok(false);
    }

    let env = [
        ("DVER", req.param_set.dver.as_str()),
        ("BASEARCH", req.param_set.basearch.as_str()),
        ("RELNUM", req.relnum),
    ];
    if let Err(e) = run_post_scripts(req.post_scripts_dir, req.stage_dir, &env) {
        error!("{:#}", e);
        return Ok(false);
    }

    if let Err(e) = tarball::create_tarball(req.stage_dir, req.tarball) {
        error!("{:#}", e);
        return Ok(false);
    }

    Ok(true)
}
