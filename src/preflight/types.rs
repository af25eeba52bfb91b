//! Preflight check types and report.

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - no build will be attempted.
    Fail,
    /// Check not applicable on this host.
    Skip,
}

impl CheckStatus {
    fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skip => "SKIP",
        }
    }
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details: details.map(str::to_string),
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details))
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details))
    }

    pub fn skip(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Skip, Some(details))
    }

    /// One report line, e.g. `[FAIL] yumdownloader: not found in PATH`.
    pub fn line(&self) -> String {
        match &self.details {
            Some(details) => format!("[{}] {}: {}", self.status.label(), self.name, details),
            None => format!("[{}] {}", self.status.label(), self.name),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    /// Count of failed checks.
    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Failed checks only.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===");
        for check in &self.checks {
            println!("  {}", check.line());
        }
        let passed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Pass)
            .count();
        println!("Summary: {}/{} passed", passed, self.checks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass("root"),
                CheckResult::skip("yum-priorities", "dnf installed"),
                CheckResult::fail("yumdownloader", "not found in PATH"),
            ],
        };

        assert!(!report.all_passed());
        assert_eq!(report.fail_count(), 1);
        assert_eq!(
            report.failures().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["yumdownloader"]
        );
    }

    #[test]
    fn test_check_lines() {
        assert_eq!(CheckResult::pass("root").line(), "[PASS] root");
        assert_eq!(
            CheckResult::pass_with("tar", "/usr/bin/tar").line(),
            "[PASS] tar: /usr/bin/tar"
        );
        assert_eq!(
            CheckResult::skip("yum-priorities", "dnf installed").line(),
            "[SKIP] yum-priorities: dnf installed"
        );
    }
}
