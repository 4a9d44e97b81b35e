// approval.rs — Bounded approval channel for one pending transaction.
//
// A channel pair per transaction: the engine holds the gate and waits on
// it with a deadline; the external approval source holds the handle and
// answers yes or no. Waiting is always bounded — no answer within the
// deadline resolves to a timeout, and a dropped handle (the approver went
// away) resolves to a rejection.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use uuid::Uuid;

/// What the engine observed while waiting for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalSignal {
    Approved,
    Rejected,
    TimedOut,
}

/// The approver's end: answer a pending transaction by id.
#[derive(Debug, Clone)]
pub struct ApprovalHandle {
    tx_id: Uuid,
    sender: SyncSender<bool>,
}

impl ApprovalHandle {
    /// The transaction this handle answers for.
    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    /// Approve the pending transaction. A late answer (the engine already
    /// timed out) is silently dropped.
    pub fn approve(self) {
        let _ = self.sender.try_send(true);
    }

    /// Reject the pending transaction.
    pub fn reject(self) {
        let _ = self.sender.try_send(false);
    }
}

/// The engine's end: wait for the answer, bounded by a deadline.
#[derive(Debug)]
pub struct ApprovalGate {
    receiver: Receiver<bool>,
}

impl ApprovalGate {
    pub fn wait(&self, timeout: Duration) -> ApprovalSignal {
        match self.receiver.recv_timeout(timeout) {
            Ok(true) => ApprovalSignal::Approved,
            Ok(false) => ApprovalSignal::Rejected,
            Err(RecvTimeoutError::Timeout) => ApprovalSignal::TimedOut,
            // All handles dropped without answering: no approval is coming.
            Err(RecvTimeoutError::Disconnected) => ApprovalSignal::Rejected,
        }
    }
}

/// Build the channel pair for one transaction.
pub fn approval_channel(tx_id: Uuid) -> (ApprovalGate, ApprovalHandle) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (ApprovalGate { receiver }, ApprovalHandle { tx_id, sender })
}
