// diff.rs — Deterministic line-based unified diff.
//
// The verifier concatenates one of these per modified path, in path order,
// to build the report diff. Output depends only on the two inputs — no
// timestamps, no randomness — so re-verifying an identical shadow yields a
// byte-identical diff.
//
// Modified files get a proper LCS (longest common subsequence) line diff
// emitted as a single hunk spanning the file, with unchanged lines as
// context. New and deleted files get the conventional /dev/null form.

/// Diff a single path given its content before and after the change.
///
/// Returns `None` when there is nothing to show: both sides absent, or
/// both sides byte-identical.
pub fn file_diff(path: &str, before: Option<&str>, after: Option<&str>) -> Option<String> {
    match (before, after) {
        (None, None) => None,
        (None, Some(new)) => Some(new_file_diff(path, new)),
        (Some(old), None) => Some(deleted_file_diff(path, old)),
        (Some(old), Some(new)) => {
            if old == new {
                None
            } else {
                Some(unified_diff(path, old, new))
            }
        }
    }
}

/// Generate a unified diff between two versions of a file.
pub fn unified_diff(path: &str, original: &str, modified: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("--- a/{}\n", path));
    output.push_str(&format!("+++ b/{}\n", path));

    let orig_lines: Vec<&str> = original.lines().collect();
    let mod_lines: Vec<&str> = modified.lines().collect();

    if orig_lines == mod_lines {
        return output;
    }

    output.push_str(&format!(
        "@@ -1,{} +1,{} @@\n",
        orig_lines.len(),
        mod_lines.len()
    ));
    for line in lcs_diff_lines(&orig_lines, &mod_lines) {
        output.push_str(&line);
        output.push('\n');
    }

    output
}

/// Generate a diff for a newly created file (one add hunk).
pub fn new_file_diff(path: &str, content: &str) -> String {
    let mut output = String::new();
    output.push_str("--- /dev/null\n");
    output.push_str(&format!("+++ b/{}\n", path));

    let lines: Vec<&str> = content.lines().collect();
    output.push_str(&format!("@@ -0,0 +1,{} @@\n", lines.len()));
    for line in &lines {
        output.push_str(&format!("+{}\n", line));
    }

    output
}

/// Generate a diff for a deleted file (one remove hunk).
pub fn deleted_file_diff(path: &str, content: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("--- a/{}\n", path));
    output.push_str("+++ /dev/null\n");

    let lines: Vec<&str> = content.lines().collect();
    output.push_str(&format!("@@ -1,{} +0,0 @@\n", lines.len()));
    for line in &lines {
        output.push_str(&format!("-{}\n", line));
    }

    output
}

/// Walk an LCS table to produce prefixed diff lines: ' ' context,
/// '-' removed, '+' added.
fn lcs_diff_lines(orig: &[&str], modified: &[&str]) -> Vec<String> {
    // Standard dynamic-programming LCS length table.
    let n = orig.len();
    let m = modified.len();
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if orig[i] == modified[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    // Walk the table front-to-back, preferring removals before additions
    // so output order is deterministic.
    let mut lines = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if orig[i] == modified[j] {
            lines.push(format!(" {}", orig[i]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            lines.push(format!("-{}", orig[i]));
            i += 1;
        } else {
            lines.push(format!("+{}", modified[j]));
            j += 1;
        }
    }
    while i < n {
        lines.push(format!("-{}", orig[i]));
        i += 1;
    }
    while j < m {
        lines.push(format!("+{}", modified[j]));
        j += 1;
    }

    lines
}
