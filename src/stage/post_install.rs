//! Post-install scripts run against the staging root.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::process::Cmd;

/// Scripts in `dir`, in lexical order. Hidden files are skipped.
pub fn list_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let meta = fs::metadata(&path).with_context(|| format!("reading {}", path.display()))?;
        if meta.is_file() {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

/// Run every script as `<script> <root>` with `env` set. Stops at the first
/// script that exits non-zero.
pub fn run_post_scripts(dir: &Path, root: &Path, env: &[(&str, &str)]) -> Result<()> {
    for script in list_scripts(dir)? {
        info!("Running post-install script {}", script.display());
        let mut cmd = Cmd::new(script.to_string_lossy()).arg_path(root);
        for (key, value) in env {
            cmd = cmd.env(key, value);
        }
        let code = cmd.run_status()?;
        if code != 0 {
            bail!(
                "post-install script {} failed (exit code {})",
                script.display(),
                code
            );
        }
    }
    Ok(())
}
