// verifier.rs — Run the check pipeline against a shadow workspace.
//
// Order: path-safety re-validation, then the strategy check (build or
// manifest parse or skip), then diff rendering. The diff iterates the
// overlay index, which is sorted, so output order is stable by path.

use std::time::Duration;

use stx_changeset::diff::file_diff;
use stx_shadow::{ShadowEntry, ShadowWorkspace};

use crate::error::VerifyError;
use crate::invoker::BuildInvoker;
use crate::project::{CheckStrategy, ProjectProfile};
use crate::report::{CheckResult, VerificationReport};

/// Check names, fixed so callers and tests can look results up.
pub const PATH_SAFETY_CHECK: &str = "path_safety";
pub const BUILD_CHECK: &str = "build";
pub const MANIFEST_CHECK: &str = "manifest";

/// Verifier tuning.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Deadline for one build invocation. A timeout is a failed check
    /// with detail "timeout", never an indefinite wait.
    pub build_timeout: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            build_timeout: Duration::from_secs(120),
        }
    }
}

/// Verify a shadow workspace for the given project profile.
///
/// Never mutates the real tree: build checks run against a materialized
/// scratch copy. Always produces path re-validation and a diff, even when
/// compilation is skipped.
pub fn verify(
    shadow: &ShadowWorkspace,
    profile: &ProjectProfile,
    invoker: &dyn BuildInvoker,
    config: &VerifyConfig,
) -> Result<VerificationReport, VerifyError> {
    let mut checks = vec![path_safety_check(shadow)];

    match CheckStrategy::select(profile) {
        CheckStrategy::Build(command) => {
            let scratch = tempfile::tempdir().map_err(|source| VerifyError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
            shadow.materialize_to(scratch.path())?;

            let outcome = invoker
                .invoke(scratch.path(), &command, config.build_timeout)
                .map_err(|source| VerifyError::Io {
                    path: scratch.path().to_path_buf(),
                    source,
                })?;

            checks.push(if outcome.timed_out {
                CheckResult::failed(BUILD_CHECK, "timeout")
            } else if outcome.success {
                CheckResult::passed(BUILD_CHECK, "exit status 0")
            } else {
                CheckResult::failed(BUILD_CHECK, outcome.output)
            });
        }
        CheckStrategy::ManifestOnly => {
            checks.push(CheckResult::skipped(
                BUILD_CHECK,
                "interpreted project, no compile step",
            ));
            checks.push(manifest_check(shadow));
        }
        CheckStrategy::Generic => {
            checks.push(CheckResult::skipped(
                BUILD_CHECK,
                "no recognized build for this project",
            ));
        }
    }

    let diff = render_diff(shadow)?;
    let report = VerificationReport { checks, diff };

    tracing::info!(
        tx_id = %shadow.tx_id(),
        passed = report.all_passed(),
        checks = report.checks.len(),
        "verification complete"
    );

    Ok(report)
}

/// Minimal verification: path re-validation and diff only.
///
/// Used by the restore path, where the staged content is a recorded
/// pre-image and re-running a build would be pointless.
pub fn verify_minimal(shadow: &ShadowWorkspace) -> Result<VerificationReport, VerifyError> {
    let checks = vec![path_safety_check(shadow)];
    let diff = render_diff(shadow)?;
    Ok(VerificationReport { checks, diff })
}

fn path_safety_check(shadow: &ShadowWorkspace) -> CheckResult {
    match shadow.validate_paths() {
        Ok(()) => CheckResult::passed(
            PATH_SAFETY_CHECK,
            format!("{} staged path(s) contained", shadow.modified_paths().len()),
        ),
        Err(err) => CheckResult::failed(PATH_SAFETY_CHECK, err.to_string()),
    }
}

/// Parse every staged TOML/JSON manifest so interpreted projects still get
/// a structural check without a compile step.
fn manifest_check(shadow: &ShadowWorkspace) -> CheckResult {
    let mut problems = Vec::new();
    let mut examined = 0;

    for (path, entry) in shadow.entries() {
        let ShadowEntry::Shadow(content) = entry else {
            continue;
        };
        if path.ends_with(".toml") {
            examined += 1;
            if let Err(err) = content.parse::<toml::Value>() {
                problems.push(format!("{}: {}", path, err));
            }
        } else if path.ends_with(".json") {
            examined += 1;
            if let Err(err) = serde_json::from_str::<serde_json::Value>(content) {
                problems.push(format!("{}: {}", path, err));
            }
        }
    }

    if problems.is_empty() {
        CheckResult::passed(
            MANIFEST_CHECK,
            format!("{} staged manifest file(s) parse", examined),
        )
    } else {
        CheckResult::failed(MANIFEST_CHECK, problems.join("; "))
    }
}

/// Render the report diff: one file diff per overlay entry, in sorted
/// path order, concatenated.
fn render_diff(shadow: &ShadowWorkspace) -> Result<String, VerifyError> {
    let mut output = String::new();
    for (path, entry) in shadow.entries() {
        let before = shadow.real_content(path)?;
        let after = match entry {
            ShadowEntry::Shadow(content) => Some(content.as_str()),
            ShadowEntry::Tombstone => None,
        };
        if let Some(diff) = file_diff(path, before.as_deref(), after) {
            output.push_str(&diff);
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::BuildOutcome;
    use crate::project::BuildCommand;
    use std::fs;
    use std::path::Path;
    use stx_changeset::{ChangeSet, FileOp};
    use tempfile::tempdir;

    /// Canned invoker: returns a fixed outcome, records the directory it
    /// was pointed at and what `main.rs` contained there at invoke time.
    struct FakeInvoker {
        outcome: BuildOutcome,
        seen: std::sync::Mutex<Option<(std::path::PathBuf, Option<String>)>>,
    }

    impl FakeInvoker {
        fn with(success: bool, timed_out: bool, output: &str) -> Self {
            Self {
                outcome: BuildOutcome {
                    success,
                    timed_out,
                    output: output.to_string(),
                },
                seen: std::sync::Mutex::new(None),
            }
        }
    }

    impl BuildInvoker for FakeInvoker {
        fn invoke(
            &self,
            dir: &Path,
            _command: &BuildCommand,
            _timeout: Duration,
        ) -> std::io::Result<BuildOutcome> {
            let main_rs = fs::read_to_string(dir.join("main.rs")).ok();
            *self.seen.lock().unwrap() = Some((dir.to_path_buf(), main_rs));
            Ok(self.outcome.clone())
        }
    }

    fn staged(root: &Path, ops: Vec<FileOp>) -> ShadowWorkspace {
        stx_shadow::stage(root, &ChangeSet::new(ops)).unwrap()
    }

    fn write_op(path: &str, content: &str) -> FileOp {
        FileOp::Write {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn unrecognized_project_skips_build_but_diffs() {
        let root = tempdir().unwrap();
        let shadow = staged(root.path(), vec![write_op("a.txt", "hello")]);

        let report = verify(
            &shadow,
            &ProjectProfile::unrecognized(),
            &FakeInvoker::with(true, false, ""),
            &VerifyConfig::default(),
        )
        .unwrap();

        assert!(report.all_passed());
        assert!(report.check(BUILD_CHECK).unwrap().was_skipped());
        assert!(report.diff.contains("+++ b/a.txt"));
        assert!(report.diff.contains("+hello"));
    }

    #[test]
    fn failing_build_lands_in_report_with_output() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("lib.rs"), "ok").unwrap();
        let shadow = staged(root.path(), vec![write_op("lib.rs", "broken")]);

        let invoker = FakeInvoker::with(false, false, "error[E0308]: mismatched types");
        let report = verify(
            &shadow,
            &ProjectProfile::compiled("cargo", vec!["check".to_string()]),
            &invoker,
            &VerifyConfig::default(),
        )
        .unwrap();

        assert!(!report.all_passed());
        let build = report.check(BUILD_CHECK).unwrap();
        assert!(!build.passed);
        assert!(build.detail.contains("E0308"));
        // Real tree untouched by verification.
        assert_eq!(fs::read_to_string(root.path().join("lib.rs")).unwrap(), "ok");
    }

    #[test]
    fn timed_out_build_fails_with_timeout_detail() {
        let root = tempdir().unwrap();
        let shadow = staged(root.path(), vec![write_op("x.txt", "x")]);

        let report = verify(
            &shadow,
            &ProjectProfile::compiled("cargo", vec!["check".to_string()]),
            &FakeInvoker::with(false, true, ""),
            &VerifyConfig::default(),
        )
        .unwrap();

        let build = report.check(BUILD_CHECK).unwrap();
        assert!(!build.passed);
        assert_eq!(build.detail, "timeout");
    }

    #[test]
    fn build_runs_against_scratch_not_real_tree() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("main.rs"), "fn main() {}").unwrap();
        let shadow = staged(root.path(), vec![write_op("main.rs", "fn main() { changed }")]);

        let invoker = FakeInvoker::with(true, false, "");
        verify(
            &shadow,
            &ProjectProfile::compiled("cargo", vec!["check".to_string()]),
            &invoker,
            &VerifyConfig::default(),
        )
        .unwrap();

        let (seen_dir, seen_main) = invoker.seen.lock().unwrap().clone().unwrap();
        // The build ran in a scratch directory that saw the staged content.
        assert_ne!(seen_dir, root.path().to_path_buf());
        assert_eq!(seen_main.unwrap(), "fn main() { changed }");
        // The real tree was never mutated.
        assert_eq!(
            fs::read_to_string(root.path().join("main.rs")).unwrap(),
            "fn main() {}"
        );
    }

    #[test]
    fn diff_is_ordered_by_path() {
        let root = tempdir().unwrap();
        let shadow = staged(
            root.path(),
            vec![write_op("zeta.txt", "z"), write_op("alpha.txt", "a")],
        );

        let report = verify_minimal(&shadow).unwrap();
        let alpha = report.diff.find("b/alpha.txt").unwrap();
        let zeta = report.diff.find("b/zeta.txt").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn interpreted_project_parses_staged_manifests() {
        let root = tempdir().unwrap();
        let shadow = staged(
            root.path(),
            vec![write_op("package.json", "{\"name\": \"demo\"}")],
        );

        let report = verify(
            &shadow,
            &ProjectProfile::interpreted(),
            &FakeInvoker::with(true, false, ""),
            &VerifyConfig::default(),
        )
        .unwrap();

        assert!(report.all_passed());
        assert!(report.check(BUILD_CHECK).unwrap().was_skipped());
        assert!(report.check(MANIFEST_CHECK).unwrap().passed);
    }

    #[test]
    fn broken_staged_manifest_fails_check() {
        let root = tempdir().unwrap();
        let shadow = staged(
            root.path(),
            vec![write_op("Cargo.toml", "[package\nname = broken")],
        );

        let report = verify(
            &shadow,
            &ProjectProfile::interpreted(),
            &FakeInvoker::with(true, false, ""),
            &VerifyConfig::default(),
        )
        .unwrap();

        assert!(!report.all_passed());
        assert!(!report.check(MANIFEST_CHECK).unwrap().passed);
    }

    #[test]
    fn minimal_verification_is_never_a_noop() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("doc.md"), "old\n").unwrap();
        let shadow = staged(root.path(), vec![write_op("doc.md", "new\n")]);

        let report = verify_minimal(&shadow).unwrap();
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, PATH_SAFETY_CHECK);
        assert!(report.diff.contains("-old"));
        assert!(report.diff.contains("+new"));
    }
}
