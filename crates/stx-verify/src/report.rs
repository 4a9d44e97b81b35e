// report.rs — Verification report types.

use serde::{Deserialize, Serialize};

/// Result of one named check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    /// Check name (e.g., "build", "path_safety", "manifest").
    pub name: String,
    /// Whether the check passed. Skipped checks count as passed.
    pub passed: bool,
    /// Human-readable detail: captured compiler output, "timeout",
    /// or "skipped: <why>".
    pub detail: String,
}

impl CheckResult {
    pub fn passed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }

    /// A check that did not apply to this project kind.
    pub fn skipped(name: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: format!("skipped: {}", why.into()),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.passed && self.detail.starts_with("skipped:")
    }
}

/// The verifier's output for one shadow workspace: named check results
/// plus a deterministic, path-ordered unified diff of all modified files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub checks: Vec<CheckResult>,
    pub diff: String,
}

impl VerificationReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Look up a check by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|check| !check.passed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_counts_as_passed() {
        let check = CheckResult::skipped("build", "no recognized build");
        assert!(check.passed);
        assert!(check.was_skipped());
        assert!(check.detail.contains("no recognized build"));
    }

    #[test]
    fn report_all_passed_requires_every_check() {
        let report = VerificationReport {
            checks: vec![
                CheckResult::passed("path_safety", "ok"),
                CheckResult::failed("build", "error[E0308]"),
            ],
            diff: String::new(),
        };
        assert!(!report.all_passed());
        assert_eq!(report.failed_checks().len(), 1);
        assert_eq!(report.check("build").unwrap().detail, "error[E0308]");
    }

    #[test]
    fn report_serialization_round_trip() {
        let report = VerificationReport {
            checks: vec![CheckResult::passed("build", "exit status 0")],
            diff: "--- a/x\n+++ b/x\n".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let restored: VerificationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.checks, report.checks);
        assert_eq!(restored.diff, report.diff);
    }
}
