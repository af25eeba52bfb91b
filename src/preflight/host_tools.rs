//! Host tool availability checks.

use crate::process;

use super::types::CheckResult;

/// External tools every build shells out to, with the package providing each.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("patch", "patch"),
    ("find", "findutils"),
    ("tar", "tar"),
    ("rpm", "rpm"),
    ("yum", "yum"),
    ("yumdownloader", "yum-utils"),
];

/// Check every required tool is on PATH.
pub fn check_host_tools() -> Vec<CheckResult> {
    REQUIRED_TOOLS
        .iter()
        .map(|(tool, package)| check_tool_exists(tool, package))
        .collect()
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => CheckResult::fail(
            tool,
            &format!("Required executable not found. Install '{}' package.", package),
        ),
    }
}
