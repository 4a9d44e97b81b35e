// stager.rs — Fold a change set into a shadow workspace.
//
// Staging is two-phase: validate everything, then build the overlay. A
// single violating path aborts before any overlay state exists, so a
// failed staging is indistinguishable from one that never started.
//
// Staging is deterministic and idempotent: it is a pure function of the
// real tree and the change set (the transaction id aside), so re-staging
// an identical set from a clean tree yields an identical shadow.

use std::path::Path;

use stx_changeset::{ChangeSet, FileOp};
use uuid::Uuid;

use crate::error::ShadowError;
use crate::overlay::ShadowWorkspace;
use crate::paths::{ensure_contained, normalize};

/// Stage a change set onto a copy-on-write shadow of `real_root`.
///
/// Fails with [`ShadowError::PathViolation`] if any target escapes the
/// root, and with [`ShadowError::FileNotFound`] if a rename source exists
/// in neither the shadow nor the real tree.
pub fn stage(real_root: &Path, changeset: &ChangeSet) -> Result<ShadowWorkspace, ShadowError> {
    // Phase 1: containment of every target, before any mutation.
    for path in changeset.touched_paths() {
        let rel = normalize(path)?;
        ensure_contained(real_root, &rel)?;
    }

    // Phase 2: fold operations, in order, into the overlay index.
    let mut shadow = ShadowWorkspace::new(Uuid::new_v4(), real_root.to_path_buf());
    for op in &changeset.ops {
        match op {
            FileOp::Write { path, content } => {
                shadow.insert_write(normalize(path)?, content.clone());
            }
            FileOp::Delete { path } => {
                shadow.insert_tombstone(normalize(path)?);
            }
            FileOp::Rename { path, new_path } => {
                let from = normalize(path)?;
                let to = normalize(new_path)?;
                // Shadow-first read so a rename can follow an earlier write.
                let content = shadow
                    .read(&from)?
                    .ok_or_else(|| ShadowError::FileNotFound { path: from.clone() })?;
                shadow.insert_tombstone(from);
                shadow.insert_write(to, content);
            }
        }
    }

    tracing::debug!(
        tx_id = %shadow.tx_id(),
        changeset_id = %changeset.changeset_id,
        staged_paths = shadow.modified_paths().len(),
        "change set staged onto shadow workspace"
    );

    Ok(shadow)
}
