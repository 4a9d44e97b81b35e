// changeset.rs — The proposed mutation set for one transaction.
//
// A ChangeSet is the only way a caller describes edits to the engine: an
// ordered list of file operations against workspace-relative paths. The
// engine makes no assumptions about how the edits were decided — an agent,
// a human, or the restore path may all produce one.
//
// The set is immutable after staging. The content hash is computed over the
// serialized operations so integrity can be verified later (e.g., when a
// snapshot replays the set's identity into the log).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A single file operation. Paths are relative to the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FileOp {
    /// Create or overwrite a file with the given content.
    Write { path: String, content: String },
    /// Remove a file. Recorded as a tombstone until commit.
    Delete { path: String },
    /// Move a file to a new path, preserving its content.
    Rename { path: String, new_path: String },
}

impl FileOp {
    /// The primary target path of this operation.
    pub fn path(&self) -> &str {
        match self {
            FileOp::Write { path, .. } | FileOp::Delete { path } | FileOp::Rename { path, .. } => {
                path
            }
        }
    }

    /// Every path this operation touches (rename touches two).
    pub fn touched_paths(&self) -> Vec<&str> {
        match self {
            FileOp::Write { path, .. } | FileOp::Delete { path } => vec![path],
            FileOp::Rename { path, new_path } => vec![path, new_path],
        }
    }
}

/// An ordered, immutable set of file operations for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Unique identifier for this change set.
    pub changeset_id: Uuid,

    /// The operations, applied in order during staging.
    pub ops: Vec<FileOp>,

    /// When this change set was created.
    pub created_at: DateTime<Utc>,

    /// SHA-256 hash of the serialized operations for integrity verification.
    pub content_hash: String,
}

impl ChangeSet {
    /// Create a new change set with an automatically computed content hash.
    pub fn new(ops: Vec<FileOp>) -> Self {
        let content_hash = compute_content_hash(&ops);
        Self {
            changeset_id: Uuid::new_v4(),
            ops,
            created_at: Utc::now(),
            content_hash,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All paths touched by any operation, in operation order.
    pub fn touched_paths(&self) -> Vec<&str> {
        self.ops.iter().flat_map(|op| op.touched_paths()).collect()
    }

    /// Verify the content hash matches the operations.
    pub fn verify_hash(&self) -> bool {
        self.content_hash == compute_content_hash(&self.ops)
    }
}

/// Compute SHA-256 hash of the serialized operations.
fn compute_content_hash(ops: &[FileOp]) -> String {
    let json = serde_json::to_string(ops).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ops() -> Vec<FileOp> {
        vec![
            FileOp::Write {
                path: "src/main.rs".to_string(),
                content: "fn main() {}\n".to_string(),
            },
            FileOp::Delete {
                path: "old.txt".to_string(),
            },
            FileOp::Rename {
                path: "a.txt".to_string(),
                new_path: "b.txt".to_string(),
            },
        ]
    }

    #[test]
    fn changeset_creation_computes_hash() {
        let cs = ChangeSet::new(sample_ops());
        assert!(!cs.content_hash.is_empty());
        assert_eq!(cs.content_hash.len(), 64); // SHA-256 hex length
        assert!(cs.verify_hash());
    }

    #[test]
    fn changeset_hash_is_deterministic() {
        let cs1 = ChangeSet::new(sample_ops());
        let cs2 = ChangeSet::new(sample_ops());
        assert_eq!(cs1.content_hash, cs2.content_hash);
        assert_ne!(cs1.changeset_id, cs2.changeset_id);
    }

    #[test]
    fn touched_paths_include_rename_target() {
        let cs = ChangeSet::new(sample_ops());
        let paths = cs.touched_paths();
        assert_eq!(paths, vec!["src/main.rs", "old.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn serialization_round_trip() {
        let cs = ChangeSet::new(sample_ops());
        let json = serde_json::to_string(&cs).unwrap();
        let restored: ChangeSet = serde_json::from_str(&json).unwrap();

        assert_eq!(cs.changeset_id, restored.changeset_id);
        assert_eq!(cs.ops, restored.ops);
        assert_eq!(cs.content_hash, restored.content_hash);
        assert!(restored.verify_hash());
    }

    #[test]
    fn op_serializes_as_snake_case() {
        let json = serde_json::to_string(&FileOp::Delete {
            path: "x".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"delete\""));
    }

    #[test]
    fn tampered_ops_fail_hash_verification() {
        let mut cs = ChangeSet::new(sample_ops());
        cs.ops.push(FileOp::Delete {
            path: "sneaky.txt".to_string(),
        });
        assert!(!cs.verify_hash());
    }
}
