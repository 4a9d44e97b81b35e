// error.rs — Engine error and terminal outcome types.
//
// Errors are infrastructure failures or caller bugs. A denied, rejected,
// timed-out, or cancelled transaction is NOT an error: those are ordinary
// terminal outcomes, reported as `TxOutcome::Discarded` so the caller gets
// a structured decision rather than a crash.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::committer::CommitResult;
use crate::transaction::TxState;

/// Errors that can occur while driving a transaction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Another transaction is already in flight for this workspace.
    #[error("transaction already in flight for workspace {root}")]
    TransactionBusy { root: PathBuf },

    /// A state-machine method was called out of order — a programming
    /// error in the caller, not a runtime condition to recover from.
    #[error("invalid transaction transition: {from} -> {to}")]
    InvalidTransition { from: TxState, to: TxState },

    /// Staging or shadow access failed.
    #[error(transparent)]
    Shadow(#[from] stx_shadow::ShadowError),

    /// Verification infrastructure failed (check *failures* live in the
    /// report, not here).
    #[error(transparent)]
    Verify(#[from] stx_verify::VerifyError),

    /// The snapshot log could not be read or written.
    #[error(transparent)]
    Snapshot(#[from] stx_snapshot::SnapshotError),

    /// A commit-time file operation failed outright before any mutation.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a transaction ended in `Discarded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    /// The governor denied the change set.
    Denied { detail: String },
    /// The approver said no.
    ApprovalRejected,
    /// No approval signal arrived within the deadline.
    ApprovalTimeout,
    /// The caller cancelled before commit began.
    Cancelled,
}

/// The terminal result of a resolved transaction.
#[derive(Debug)]
pub enum TxOutcome {
    Committed(CommitResult),
    Discarded(DiscardReason),
}

impl TxOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }
}
