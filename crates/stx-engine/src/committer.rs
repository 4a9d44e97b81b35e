// committer.rs — Atomically apply an approved shadow to the real tree.
//
// The only code in the system that writes the real tree. Order of
// operations is fixed:
//
//   1. Capture pre-images of every touched path and record the snapshot
//      durably — before any mutation.
//   2. Apply staged writes, each via write-temp-then-atomic-rename so a
//      crash can never leave a half-written target.
//   3. Apply tombstoned deletions last, after all writes succeeded.
//
// A failure partway through triggers best-effort restoration from the
// just-recorded snapshot and is surfaced as `PartialFailure` — never
// swallowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use uuid::Uuid;

use stx_policy::PolicyDecision;
use stx_shadow::{ShadowEntry, ShadowWorkspace};
use stx_snapshot::{Snapshot, SnapshotStore};

use crate::error::EngineError;
use crate::transaction::TxState;

/// Suffix for in-flight temporary files; never left behind on success.
const TMP_SUFFIX: &str = ".stx-tmp";

/// Terminal result of a commit.
#[derive(Debug)]
pub enum CommitResult {
    /// Every operation applied. Paths are sorted.
    Applied {
        snapshot_id: Uuid,
        changed_paths: Vec<String>,
    },
    /// An operation failed mid-commit; restoration from the snapshot was
    /// attempted. `restored` and `unrestored` partition the touched paths.
    PartialFailure {
        snapshot_id: Uuid,
        failed_path: String,
        error: String,
        restored: Vec<String>,
        unrestored: Vec<String>,
    },
}

/// Apply the shadow to the real tree under an `Allow` decision.
///
/// Any other decision is a caller bug and fails with `InvalidTransition`
/// before anything is captured or written.
pub fn commit(
    shadow: &ShadowWorkspace,
    changeset_id: Uuid,
    decision: &PolicyDecision,
    store: &mut SnapshotStore,
) -> Result<CommitResult, EngineError> {
    if *decision != PolicyDecision::Allow {
        tracing::warn!(tx_id = %shadow.tx_id(), ?decision, "commit attempted without allow");
        return Err(EngineError::InvalidTransition {
            from: TxState::Decided,
            to: TxState::Committed,
        });
    }

    let root = shadow.real_root().to_path_buf();

    // Pre-images first. Any read failure here aborts cleanly: nothing has
    // been recorded or mutated yet.
    let mut pre_images: BTreeMap<String, Option<String>> = BTreeMap::new();
    for (path, _) in shadow.entries() {
        pre_images.insert(path.to_string(), shadow.real_content(path)?);
    }

    let snapshot = Snapshot::new(changeset_id, pre_images);
    store.record(&snapshot)?;

    // Writes first, deletions last, both in sorted path order.
    let mut applied: Vec<String> = Vec::new();
    let mut failure: Option<(String, std::io::Error)> = None;

    'apply: for pass in [true, false] {
        for (rel, entry) in shadow.entries() {
            let target = root.join(rel);
            let result = match (entry, pass) {
                (ShadowEntry::Shadow(content), true) => atomic_write(&target, content),
                (ShadowEntry::Tombstone, false) => remove_existing(&target),
                _ => continue,
            };
            match result {
                Ok(()) => applied.push(rel.to_string()),
                Err(err) => {
                    failure = Some((rel.to_string(), err));
                    break 'apply;
                }
            }
        }
    }

    if let Some((failed_path, err)) = failure {
        let (restored, unrestored) = restore_pre_images(&root, &snapshot);
        tracing::warn!(
            tx_id = %shadow.tx_id(),
            snapshot_id = %snapshot.snapshot_id,
            failed_path = %failed_path,
            restored = restored.len(),
            unrestored = unrestored.len(),
            "commit failed mid-apply, pre-images restored best-effort"
        );
        return Ok(CommitResult::PartialFailure {
            snapshot_id: snapshot.snapshot_id,
            failed_path,
            error: err.to_string(),
            restored,
            unrestored,
        });
    }

    applied.sort();
    tracing::info!(
        tx_id = %shadow.tx_id(),
        snapshot_id = %snapshot.snapshot_id,
        paths = applied.len(),
        "commit applied"
    );
    Ok(CommitResult::Applied {
        snapshot_id: snapshot.snapshot_id,
        changed_paths: applied,
    })
}

/// Write content to a sibling temp file, then rename into place. The
/// rename is atomic on the same filesystem, so readers see either the old
/// content or the new — never a partial write.
fn atomic_write(target: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(TMP_SUFFIX);
    let tmp = target.with_file_name(tmp_name);

    fs::write(&tmp, content)?;
    if let Err(err) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

fn remove_existing(target: &Path) -> std::io::Result<()> {
    match fs::remove_file(target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Put every touched path back to its pre-image. Best effort: failures are
/// collected, not propagated.
fn restore_pre_images(root: &Path, snapshot: &Snapshot) -> (Vec<String>, Vec<String>) {
    let mut restored = Vec::new();
    let mut unrestored = Vec::new();

    for (rel, pre) in &snapshot.pre_images {
        let target = root.join(rel);
        let result = match pre {
            Some(content) => atomic_write(&target, content),
            None => remove_existing(&target),
        };
        match result {
            Ok(()) => restored.push(rel.clone()),
            Err(_) => unrestored.push(rel.clone()),
        }
    }

    (restored, unrestored)
}
