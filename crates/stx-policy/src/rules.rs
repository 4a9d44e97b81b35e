// rules.rs — The enumerated destructive-operation rule set.
//
// A small, closed list — not a configurable pattern language. Each rule
// names a class of operation that is denied no matter what the checks
// said and no matter the operating mode:
//
// 1. Deletion of the workspace root itself (recursive wipe).
// 2. Any write/delete/rename into VCS history (`.git/` internals) — the
//    file-operation equivalent of force-rewriting a remote's history.
// 3. Relative traversal in any raw target path (containment violation
//    caught here as well as in the stager, so the decision never depends
//    on staging having run).

use glob::Pattern;

use stx_changeset::{ChangeSet, FileOp};

/// Glob patterns matching VCS history internals. Invalid patterns never
/// match (fail-closed), same as the capability matcher convention.
const VCS_HISTORY_PATTERNS: &[&str] = &[".git", ".git/**", "**/.git", "**/.git/**"];

/// Return the reason the change set is forbidden, if any rule matches.
pub fn forbidden_reason(changeset: &ChangeSet) -> Option<String> {
    for op in &changeset.ops {
        for path in op.touched_paths() {
            if contains_traversal(path) {
                return Some(format!("path traversal in target '{}'", path));
            }
            if is_workspace_root(path) {
                if matches!(op, FileOp::Delete { .. }) {
                    return Some("recursive deletion of the workspace root".to_string());
                }
                return Some(format!("operation targets the workspace root: '{}'", path));
            }
            if targets_vcs_history(path) {
                return Some(format!(
                    "operation rewrites version-control history: '{}'",
                    path
                ));
            }
        }
    }
    None
}

/// Detect path traversal attempts in a raw target.
///
/// Checked on the raw string rather than a normalized path, to catch
/// encoding tricks before any resolution happens.
fn contains_traversal(path: &str) -> bool {
    path.split(['/', '\\']).any(|seg| seg == "..")
        || path.contains("%2e%2e")
        || path.contains("%2E%2E")
}

fn is_workspace_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed.is_empty() || trimmed == "." || trimmed == "./"
}

fn targets_vcs_history(path: &str) -> bool {
    let normalized = path.trim_start_matches("./").replace('\\', "/");
    VCS_HISTORY_PATTERNS.iter().any(|pattern| {
        Pattern::new(pattern)
            .map(|p| p.matches(&normalized))
            .unwrap_or(false)
    })
}
