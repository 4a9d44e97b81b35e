// overlay.rs — The copy-on-write overlay index.
//
// A ShadowWorkspace maps each staged path to its pending state. Paths not
// present in the index resolve to the real tree — unmodified files are
// never duplicated. The index is a BTreeMap so every iteration (diffing,
// snapshot capture, commit) sees paths in stable sorted order.
//
// The workspace is exclusively owned by its transaction: nothing here
// touches the real tree except reads, and materialization writes only to a
// caller-supplied scratch directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ShadowError;
use crate::paths::RESERVED_DIR;
use crate::paths::{ensure_contained, normalize};

/// Directory names never copied when materializing the shadow for a build
/// check. Build artifacts are regenerated by the check itself; `.git` and
/// the reserved subtree are engine/VCS state, not project source.
const MATERIALIZE_EXCLUDES: &[&str] = &[
    RESERVED_DIR,
    ".git",
    "target",
    "node_modules",
    "__pycache__",
    ".venv",
    "dist",
    "build",
];

/// The staged state of one path in the overlay index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowEntry {
    /// The path has staged content replacing whatever the real tree holds.
    Shadow(String),
    /// The path is deleted in the shadow; applied last at commit time.
    Tombstone,
}

/// How a path resolves through the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Not in the index — falls through to the real tree.
    Real,
    /// Staged content.
    Shadow(&'a str),
    /// Staged deletion.
    Tombstone,
}

/// An isolated copy-on-write staging view over a real project tree.
#[derive(Debug)]
pub struct ShadowWorkspace {
    tx_id: Uuid,
    real_root: PathBuf,
    entries: BTreeMap<String, ShadowEntry>,
}

impl ShadowWorkspace {
    pub(crate) fn new(tx_id: Uuid, real_root: PathBuf) -> Self {
        Self {
            tx_id,
            real_root,
            entries: BTreeMap::new(),
        }
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    pub fn real_root(&self) -> &Path {
        &self.real_root
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a normalized path through the overlay index.
    pub fn resolve(&self, rel: &str) -> Resolved<'_> {
        match self.entries.get(rel) {
            None => Resolved::Real,
            Some(ShadowEntry::Shadow(content)) => Resolved::Shadow(content),
            Some(ShadowEntry::Tombstone) => Resolved::Tombstone,
        }
    }

    /// Read a path shadow-first, falling back to the real tree.
    ///
    /// Returns `None` for tombstoned paths and paths absent from both
    /// layers.
    pub fn read(&self, rel: &str) -> Result<Option<String>, ShadowError> {
        match self.resolve(rel) {
            Resolved::Shadow(content) => Ok(Some(content.to_string())),
            Resolved::Tombstone => Ok(None),
            Resolved::Real => self.real_content(rel),
        }
    }

    /// Read a path from the real tree only (the pre-image view).
    pub fn real_content(&self, rel: &str) -> Result<Option<String>, ShadowError> {
        let abs = self.real_root.join(rel);
        if !abs.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&abs)
            .map(Some)
            .map_err(|source| ShadowError::Io { path: abs, source })
    }

    /// Iterate overlay entries in sorted path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ShadowEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// All paths with staged state, sorted.
    pub fn modified_paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Re-validate containment of every indexed path.
    ///
    /// Staging already validated these, but the verifier runs the check
    /// again so a decision never rests on state it did not inspect itself.
    pub fn validate_paths(&self) -> Result<(), ShadowError> {
        for path in self.entries.keys() {
            normalize(path)?;
            ensure_contained(&self.real_root, path)?;
        }
        Ok(())
    }

    /// Materialize the shadow view into a scratch directory.
    ///
    /// Copies the real tree (minus excluded state/artifact directories),
    /// then applies overlay entries on top. Build checks run against the
    /// result and can never mutate the real tree.
    pub fn materialize_to(&self, dir: &Path) -> Result<(), ShadowError> {
        copy_dir_recursive(&self.real_root, dir)?;

        for (rel, entry) in &self.entries {
            let dst = dir.join(rel);
            match entry {
                ShadowEntry::Shadow(content) => {
                    if let Some(parent) = dst.parent() {
                        fs::create_dir_all(parent).map_err(|source| ShadowError::Io {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                    }
                    fs::write(&dst, content)
                        .map_err(|source| ShadowError::Io { path: dst, source })?;
                }
                ShadowEntry::Tombstone => {
                    if dst.exists() {
                        fs::remove_file(&dst)
                            .map_err(|source| ShadowError::Io { path: dst, source })?;
                    }
                }
            }
        }

        Ok(())
    }

    pub(crate) fn insert_write(&mut self, rel: String, content: String) {
        self.entries.insert(rel, ShadowEntry::Shadow(content));
    }

    pub(crate) fn insert_tombstone(&mut self, rel: String) {
        self.entries.insert(rel, ShadowEntry::Tombstone);
    }
}

/// Recursively copy a directory, skipping excluded names.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), ShadowError> {
    fs::create_dir_all(dst).map_err(|source| ShadowError::Io {
        path: dst.to_path_buf(),
        source,
    })?;

    let entries = fs::read_dir(src).map_err(|source| ShadowError::Io {
        path: src.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ShadowError::Io {
            path: src.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if MATERIALIZE_EXCLUDES.contains(&name.as_ref()) {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(&file_name);

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if src_path.is_file() {
            fs::copy(&src_path, &dst_path).map_err(|source| ShadowError::Io {
                path: dst_path,
                source,
            })?;
        }
        // Sockets, fifos, dangling links: skipped — not project source.
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace_with(root: &Path) -> ShadowWorkspace {
        ShadowWorkspace::new(Uuid::new_v4(), root.to_path_buf())
    }

    #[test]
    fn unmodified_paths_resolve_to_real_tree() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "real content").unwrap();

        let shadow = workspace_with(root.path());
        assert_eq!(shadow.resolve("a.txt"), Resolved::Real);
        assert_eq!(shadow.read("a.txt").unwrap().unwrap(), "real content");
    }

    #[test]
    fn shadowed_content_wins_over_real() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "old").unwrap();

        let mut shadow = workspace_with(root.path());
        shadow.insert_write("a.txt".to_string(), "new".to_string());

        assert_eq!(shadow.read("a.txt").unwrap().unwrap(), "new");
        // Real tree untouched.
        assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "old");
    }

    #[test]
    fn tombstone_hides_real_file() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), "doomed").unwrap();

        let mut shadow = workspace_with(root.path());
        shadow.insert_tombstone("a.txt".to_string());

        assert!(shadow.read("a.txt").unwrap().is_none());
        assert!(root.path().join("a.txt").exists());
    }

    #[test]
    fn modified_paths_are_sorted() {
        let root = tempdir().unwrap();
        let mut shadow = workspace_with(root.path());
        shadow.insert_write("zeta.txt".to_string(), "z".to_string());
        shadow.insert_write("alpha.txt".to_string(), "a".to_string());
        shadow.insert_tombstone("mid.txt".to_string());

        assert_eq!(shadow.modified_paths(), vec!["alpha.txt", "mid.txt", "zeta.txt"]);
    }

    #[test]
    fn materialize_applies_overlay_on_copy() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("keep.txt"), "keep").unwrap();
        fs::write(root.path().join("gone.txt"), "gone").unwrap();
        fs::create_dir_all(root.path().join(".stx")).unwrap();
        fs::write(root.path().join(".stx/snapshots.jsonl"), "internal").unwrap();

        let mut shadow = workspace_with(root.path());
        shadow.insert_write("new/file.txt".to_string(), "staged".to_string());
        shadow.insert_tombstone("gone.txt".to_string());

        let scratch = tempdir().unwrap();
        shadow.materialize_to(scratch.path()).unwrap();

        assert_eq!(
            fs::read_to_string(scratch.path().join("keep.txt")).unwrap(),
            "keep"
        );
        assert_eq!(
            fs::read_to_string(scratch.path().join("new/file.txt")).unwrap(),
            "staged"
        );
        assert!(!scratch.path().join("gone.txt").exists());
        // Reserved subtree never leaks into the materialized view.
        assert!(!scratch.path().join(".stx").exists());
    }

    #[test]
    fn validate_paths_catches_bad_entry() {
        let root = tempdir().unwrap();
        let mut shadow = workspace_with(root.path());
        // Bypass the stager deliberately.
        shadow.insert_write("../escape.txt".to_string(), "x".to_string());

        assert!(matches!(
            shadow.validate_paths(),
            Err(ShadowError::PathViolation { .. })
        ));
    }
}
