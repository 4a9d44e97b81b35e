// governor.rs — The policy decision point.
//
// `decide` is pure: same inputs, same decision. Rule order matters and is
// fixed — destructive patterns first, then verification results, then
// mode. A Deny can therefore never be softened into RequiresApproval by a
// later rule.

use serde::{Deserialize, Serialize};

use stx_changeset::ChangeSet;
use stx_verify::VerificationReport;

use crate::rules;

/// How the engine is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Every commit needs an explicit approval signal.
    Manual,
    /// Commits proceed unattended, up to the configured streak ceiling.
    Autonomous,
}

/// The Governor's verdict on a verified change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
    RequiresApproval,
}

/// Governor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Consecutive unattended commits allowed before the next one must be
    /// approved by a human.
    pub max_autonomous_commits: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_autonomous_commits: 50,
        }
    }
}

/// The policy gate between verification and commit.
#[derive(Debug, Clone, Default)]
pub struct Governor {
    config: GovernorConfig,
}

impl Governor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    /// Decide the fate of a verified change set.
    ///
    /// `autonomous_streak` is the number of consecutive commits made
    /// without human approval; the caller maintains it and resets it on
    /// every approved commit.
    pub fn decide(
        &self,
        changeset: &ChangeSet,
        report: &VerificationReport,
        mode: OperatingMode,
        autonomous_streak: usize,
    ) -> PolicyDecision {
        if let Some(reason) = rules::forbidden_reason(changeset) {
            tracing::warn!(
                changeset_id = %changeset.changeset_id,
                %reason,
                "change set denied by destructive-operation rule"
            );
            return PolicyDecision::Deny { reason };
        }

        if let Some(failed) = report.failed_checks().first() {
            let reason = format!("check '{}' failed: {}", failed.name, failed.detail);
            tracing::info!(
                changeset_id = %changeset.changeset_id,
                check = %failed.name,
                "change set denied by failed verification check"
            );
            return PolicyDecision::Deny { reason };
        }

        match mode {
            OperatingMode::Manual => PolicyDecision::RequiresApproval,
            OperatingMode::Autonomous => {
                if autonomous_streak >= self.config.max_autonomous_commits {
                    tracing::info!(
                        changeset_id = %changeset.changeset_id,
                        streak = autonomous_streak,
                        ceiling = self.config.max_autonomous_commits,
                        "autonomous commit ceiling reached, escalating to approval"
                    );
                    PolicyDecision::RequiresApproval
                } else {
                    PolicyDecision::Allow
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stx_changeset::FileOp;
    use stx_verify::{CheckResult, PATH_SAFETY_CHECK};

    fn benign_changeset() -> ChangeSet {
        ChangeSet::new(vec![FileOp::Write {
            path: "src/lib.rs".to_string(),
            content: "pub fn f() {}".to_string(),
        }])
    }

    fn destructive_changeset() -> ChangeSet {
        ChangeSet::new(vec![FileOp::Delete {
            path: ".git".to_string(),
        }])
    }

    fn passing_report() -> VerificationReport {
        VerificationReport {
            checks: vec![CheckResult::passed(PATH_SAFETY_CHECK, "1 staged path(s) contained")],
            diff: String::new(),
        }
    }

    fn failing_report() -> VerificationReport {
        VerificationReport {
            checks: vec![CheckResult::failed("build", "error[E0308]: mismatched types")],
            diff: String::new(),
        }
    }

    #[test]
    fn autonomous_mode_allows_verified_benign_change() {
        let governor = Governor::default();
        let decision = governor.decide(
            &benign_changeset(),
            &passing_report(),
            OperatingMode::Autonomous,
            0,
        );
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn manual_mode_always_requires_approval() {
        let governor = Governor::default();
        let decision = governor.decide(
            &benign_changeset(),
            &passing_report(),
            OperatingMode::Manual,
            0,
        );
        assert_eq!(decision, PolicyDecision::RequiresApproval);
    }

    #[test]
    fn failed_check_denies_rather_than_escalates() {
        let governor = Governor::default();
        for mode in [OperatingMode::Manual, OperatingMode::Autonomous] {
            let decision = governor.decide(&benign_changeset(), &failing_report(), mode, 0);
            match decision {
                PolicyDecision::Deny { reason } => {
                    assert!(reason.contains("build"));
                    assert!(reason.contains("E0308"));
                }
                other => panic!("expected Deny, got {:?}", other),
            }
        }
    }

    #[test]
    fn destructive_pattern_denies_regardless_of_mode_and_report() {
        let governor = Governor::default();
        for mode in [OperatingMode::Manual, OperatingMode::Autonomous] {
            let decision = governor.decide(&destructive_changeset(), &passing_report(), mode, 0);
            assert!(matches!(decision, PolicyDecision::Deny { .. }));
        }
    }

    #[test]
    fn autonomous_ceiling_escalates_to_approval() {
        let governor = Governor::new(GovernorConfig {
            max_autonomous_commits: 3,
        });
        let cs = benign_changeset();

        assert_eq!(
            governor.decide(&cs, &passing_report(), OperatingMode::Autonomous, 2),
            PolicyDecision::Allow
        );
        assert_eq!(
            governor.decide(&cs, &passing_report(), OperatingMode::Autonomous, 3),
            PolicyDecision::RequiresApproval
        );
        assert_eq!(
            governor.decide(&cs, &passing_report(), OperatingMode::Autonomous, 7),
            PolicyDecision::RequiresApproval
        );
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_string(&PolicyDecision::Deny {
            reason: "nope".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"decision\":\"deny\""));
        assert!(json.contains("\"reason\":\"nope\""));
    }
}
