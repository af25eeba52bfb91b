//! Preflight checks, run once before any build.
//!
//! Validates privileges, host tools and the package manager's priorities
//! plugin. Any failure stops the run before a staging directory is created.

mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};
use tracing::info;

pub use host_tools::REQUIRED_TOOLS;
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight() -> PreflightReport {
    let mut checks = Vec::new();

    info!("Checking privileges");
    checks.push(environment::check_privileges());

    info!("Checking required tools");
    checks.extend(host_tools::check_host_tools());

    info!("Checking yum-priorities");
    checks.push(environment::check_priorities_plugin());

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail() -> Result<()> {
    let report = run_preflight();
    report.print();

    if !report.all_passed() {
        let failed: Vec<_> = report.failures().map(|c| c.name.as_str()).collect();
        bail!(
            "Preflight failed: {} check(s) failed ({})",
            report.fail_count(),
            failed.join(", ")
        );
    }

    Ok(())
}
