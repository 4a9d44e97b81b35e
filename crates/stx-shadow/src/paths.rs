// paths.rs — Path normalization and containment checks.
//
// Every change-set target passes through here before any overlay state is
// created. Two layers:
//
// 1. `normalize` — purely lexical: rejects absolute paths, collapses `.`,
//    resolves `..` without ever letting it climb above the root, and
//    rejects targets inside the reserved `.stx/` subtree.
// 2. `ensure_contained` — filesystem-aware: walks the existing prefix of
//    the target and rejects any symbolic link whose resolved target lies
//    outside the workspace root. Dangling links fail closed.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ShadowError;

/// Reserved subtree for engine state (shadow metadata, snapshot log).
/// Never a valid staging target, never visible to checks.
pub const RESERVED_DIR: &str = ".stx";

/// Normalize a workspace-relative path lexically.
///
/// Returns the canonical forward-slash form, or `PathViolation` if the path
/// is absolute, escapes the root via `..`, resolves to the root itself, or
/// targets the reserved subtree.
pub fn normalize(path: &str) -> Result<String, ShadowError> {
    if path.is_empty() {
        return Err(violation(path, "empty path"));
    }

    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(seg) => parts.push(seg.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(violation(path, "relative traversal escapes the workspace root"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(violation(path, "absolute paths are not allowed"));
            }
        }
    }

    if parts.is_empty() {
        return Err(violation(path, "resolves to the workspace root"));
    }
    if parts[0] == RESERVED_DIR {
        return Err(violation(path, "targets the reserved engine state subtree"));
    }

    Ok(parts.join("/"))
}

/// Check that a normalized relative path cannot escape the workspace root
/// through a symbolic link in any existing component.
pub fn ensure_contained(real_root: &Path, rel: &str) -> Result<(), ShadowError> {
    let canon_root = fs::canonicalize(real_root).map_err(|source| ShadowError::Io {
        path: real_root.to_path_buf(),
        source,
    })?;

    let mut probe: PathBuf = real_root.to_path_buf();
    for segment in rel.split('/') {
        probe.push(segment);

        // Once a component does not exist, nothing deeper can be a link.
        let meta = match fs::symlink_metadata(&probe) {
            Ok(meta) => meta,
            Err(_) => break,
        };

        if meta.file_type().is_symlink() {
            let resolved = fs::canonicalize(&probe)
                .map_err(|_| violation(rel, "unresolvable symbolic link in path"))?;
            if !resolved.starts_with(&canon_root) {
                return Err(violation(rel, "symbolic link escapes the workspace root"));
            }
        }
    }

    Ok(())
}

fn violation(path: &str, reason: &str) -> ShadowError {
    ShadowError::PathViolation {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
