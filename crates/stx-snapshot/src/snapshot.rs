// snapshot.rs — Immutable pre-image record for one committed change set.
//
// A snapshot stores, per touched path, the content the real tree held
// *before* the commit (`None` = the path did not exist). That is exactly
// the information needed to build the inverse change set, so restoration
// can ride the same stage/verify/commit pipeline as a forward transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use stx_changeset::{ChangeSet, FileOp};

/// Pre-images of every path a committed change set touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: Uuid,
    /// Id of the change set whose commit this snapshot guards.
    pub changeset_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Normalized relative path → prior content. `None` means the path was
    /// absent before the commit. BTreeMap keeps iteration path-ordered.
    pub pre_images: BTreeMap<String, Option<String>>,
    /// SHA-256 over the pre-images, fixed at construction.
    pub content_hash: String,
}

impl Snapshot {
    pub fn new(changeset_id: Uuid, pre_images: BTreeMap<String, Option<String>>) -> Self {
        let content_hash = compute_content_hash(&pre_images);
        Self {
            snapshot_id: Uuid::new_v4(),
            changeset_id,
            created_at: Utc::now(),
            pre_images,
            content_hash,
        }
    }

    /// Build the change set that undoes the commit this snapshot guards:
    /// a write of the prior content for every path that existed, a delete
    /// for every path that did not.
    pub fn inverse_changeset(&self) -> ChangeSet {
        let ops = self
            .pre_images
            .iter()
            .map(|(path, pre)| match pre {
                Some(content) => FileOp::Write {
                    path: path.clone(),
                    content: content.clone(),
                },
                None => FileOp::Delete { path: path.clone() },
            })
            .collect();
        ChangeSet::new(ops)
    }

    /// Check the stored hash against the current pre-image contents.
    pub fn verify_hash(&self) -> bool {
        compute_content_hash(&self.pre_images) == self.content_hash
    }
}

fn compute_content_hash(pre_images: &BTreeMap<String, Option<String>>) -> String {
    let mut hasher = Sha256::new();
    for (path, pre) in pre_images {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        match pre {
            Some(content) => {
                hasher.update([1u8]);
                hasher.update(content.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut pre = BTreeMap::new();
        pre.insert("src/lib.rs".to_string(), Some("old body\n".to_string()));
        pre.insert("src/new.rs".to_string(), None);
        Snapshot::new(Uuid::new_v4(), pre)
    }

    #[test]
    fn inverse_restores_existing_and_deletes_created() {
        let snapshot = sample();
        let inverse = snapshot.inverse_changeset();

        assert_eq!(inverse.ops.len(), 2);
        assert!(matches!(
            &inverse.ops[0],
            FileOp::Write { path, content } if path == "src/lib.rs" && content == "old body\n"
        ));
        assert!(matches!(
            &inverse.ops[1],
            FileOp::Delete { path } if path == "src/new.rs"
        ));
    }

    #[test]
    fn hash_detects_tampering() {
        let mut snapshot = sample();
        assert!(snapshot.verify_hash());

        snapshot
            .pre_images
            .insert("src/lib.rs".to_string(), Some("altered".to_string()));
        assert!(!snapshot.verify_hash());
    }

    #[test]
    fn absent_and_empty_pre_images_hash_differently() {
        let mut a = BTreeMap::new();
        a.insert("f".to_string(), None);
        let mut b = BTreeMap::new();
        b.insert("f".to_string(), Some(String::new()));

        let sa = Snapshot::new(Uuid::new_v4(), a);
        let sb = Snapshot::new(Uuid::new_v4(), b);
        assert_ne!(sa.content_hash, sb.content_hash);
    }

    #[test]
    fn serde_round_trip() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.snapshot_id, snapshot.snapshot_id);
        assert_eq!(back.pre_images, snapshot.pre_images);
        assert!(back.verify_hash());
    }
}
