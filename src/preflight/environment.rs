//! Privilege and package manager plugin checks.

use crate::process::{self, Cmd};

use super::types::CheckResult;

/// The build installs into a chroot-like root and needs to own the files.
pub fn check_privileges() -> CheckResult {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    privileges_result(euid)
}

fn privileges_result(euid: u32) -> CheckResult {
    if euid == 0 {
        CheckResult::pass("root privileges")
    } else {
        CheckResult::fail(
            "root privileges",
            &format!("running as uid {}; you need to be root to run this", euid),
        )
    }
}

/// Repo priorities only work under yum with the priorities plugin; dnf
/// handles them natively.
pub fn check_priorities_plugin() -> CheckResult {
    if !process::exists("rpm") {
        return CheckResult::fail("yum-priorities", "cannot query: rpm not found");
    }
    plugin_result(rpm_query(&["-q", "dnf"]), || {
        rpm_query(&["--whatprovides", "-q", "yum-priorities"])
    })
}

fn rpm_query(args: &[&str]) -> bool {
    Cmd::new("rpm")
        .args(args)
        .allow_fail()
        .run()
        .map(|r| r.success())
        .unwrap_or(false)
}

fn plugin_result(dnf_installed: bool, plugin_provided: impl FnOnce() -> bool) -> CheckResult {
    if dnf_installed {
        CheckResult::skip("yum-priorities", "dnf installed, plugin not needed")
    } else if plugin_provided() {
        CheckResult::pass("yum-priorities")
    } else {
        CheckResult::fail("yum-priorities", "nothing is providing yum-priorities")
    }
}
