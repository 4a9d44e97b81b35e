// transaction.rs — The transaction handle, state machine, and engine.
//
// One Transaction per attempted change set. The handle carries its own
// workspace lock token; holding the handle IS holding the lock, and
// dropping it (any path, including errors) releases the workspace. No
// ambient "current transaction" state exists anywhere.
//
// States move strictly forward:
//
//   Staged -> Verified -> Decided -> Committed | Discarded
//
// Committed and Discarded are terminal. Out-of-order calls are caller
// bugs and fail with InvalidTransition.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stx_changeset::ChangeSet;
use stx_policy::{Governor, GovernorConfig, OperatingMode, PolicyDecision};
use stx_shadow::paths::RESERVED_DIR;
use stx_shadow::ShadowWorkspace;
use stx_snapshot::SnapshotStore;
use stx_verify::{BuildInvoker, ProcessInvoker, ProjectProfile, VerificationReport, VerifyConfig};

use crate::approval::{approval_channel, ApprovalGate, ApprovalHandle, ApprovalSignal};
use crate::committer;
use crate::error::{DiscardReason, EngineError, TxOutcome};

/// Where the snapshot log lives, inside the reserved subtree.
pub fn snapshot_log_path(root: &Path) -> PathBuf {
    root.join(RESERVED_DIR).join("snapshots.jsonl")
}

/// Transaction lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Staged,
    Verified,
    Decided,
    Committed,
    Discarded,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Staged => "staged",
            TxState::Verified => "verified",
            TxState::Decided => "decided",
            TxState::Committed => "committed",
            TxState::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub governor: GovernorConfig,
    pub verify: VerifyConfig,
    /// Deadline for a RequiresApproval wait; expiry discards.
    pub approval_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            governor: GovernorConfig::default(),
            verify: VerifyConfig::default(),
            approval_timeout: Duration::from_secs(60),
        }
    }
}

/// Registry of workspaces with a transaction in flight. Keyed by
/// canonicalized root so two paths to the same directory collide.
fn active_workspaces() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Lock token for one workspace. Released on drop.
#[derive(Debug)]
struct WorkspaceLock {
    root: PathBuf,
}

impl WorkspaceLock {
    fn acquire(root: &Path) -> Result<Self, EngineError> {
        let canonical = root.canonicalize().map_err(|source| EngineError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let mut active = active_workspaces()
            .lock()
            .expect("workspace registry poisoned");
        if !active.insert(canonical.clone()) {
            return Err(EngineError::TransactionBusy { root: canonical });
        }
        Ok(Self { root: canonical })
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let mut active = active_workspaces()
            .lock()
            .expect("workspace registry poisoned");
        active.remove(&self.root);
    }
}

/// Handle for one in-flight transaction. Owns the shadow workspace and
/// the workspace lock for its whole lifetime.
#[derive(Debug)]
pub struct Transaction {
    tx_id: Uuid,
    changeset: ChangeSet,
    mode: OperatingMode,
    state: TxState,
    shadow: ShadowWorkspace,
    report: Option<VerificationReport>,
    decision: Option<PolicyDecision>,
    gate: ApprovalGate,
    handle: Option<ApprovalHandle>,
    _lock: WorkspaceLock,
}

impl Transaction {
    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn changeset(&self) -> &ChangeSet {
        &self.changeset
    }

    /// The verification report, once `verify` has run.
    pub fn report(&self) -> Option<&VerificationReport> {
        self.report.as_ref()
    }

    /// The governor's verdict, once `decide` has run.
    pub fn decision(&self) -> Option<&PolicyDecision> {
        self.decision.as_ref()
    }

    /// Take the approval handle for the external approval source.
    ///
    /// Available once; the engine keeps the other end and waits on it when
    /// the decision is RequiresApproval.
    pub fn approval_handle(&mut self) -> Option<ApprovalHandle> {
        self.handle.take()
    }

    fn expect_state(&self, expected: TxState, to: TxState) -> Result<(), EngineError> {
        if self.state != expected {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }
}

/// The speculative transaction engine.
///
/// Drives change sets through stage, verify, decide, and commit/discard.
/// The engine itself is stateless apart from configuration and the
/// consecutive-autonomous-commit counter the governor consults.
pub struct Engine {
    config: EngineConfig,
    governor: Governor,
    invoker: Box<dyn BuildInvoker>,
    autonomous_streak: AtomicUsize,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_invoker(config, Box::new(ProcessInvoker))
    }

    /// Use a custom build invoker (tests, remote builders).
    pub fn with_invoker(config: EngineConfig, invoker: Box<dyn BuildInvoker>) -> Self {
        let governor = Governor::new(config.governor.clone());
        Self {
            config,
            governor,
            invoker,
            autonomous_streak: AtomicUsize::new(0),
        }
    }

    /// Consecutive commits made without human approval.
    pub fn autonomous_streak(&self) -> usize {
        self.autonomous_streak.load(Ordering::SeqCst)
    }

    /// Open a transaction: acquire the workspace lock and stage the change
    /// set. A path violation aborts with no shadow state and releases the
    /// lock immediately.
    pub fn begin(
        &self,
        root: &Path,
        changeset: ChangeSet,
        mode: OperatingMode,
    ) -> Result<Transaction, EngineError> {
        let lock = WorkspaceLock::acquire(root)?;
        let shadow = stx_shadow::stage(&lock.root, &changeset)?;
        let tx_id = shadow.tx_id();
        let (gate, handle) = approval_channel(tx_id);

        tracing::info!(
            %tx_id,
            changeset_id = %changeset.changeset_id,
            ops = changeset.ops.len(),
            ?mode,
            "transaction staged"
        );

        Ok(Transaction {
            tx_id,
            changeset,
            mode,
            state: TxState::Staged,
            shadow,
            report: None,
            decision: None,
            gate,
            handle: Some(handle),
            _lock: lock,
        })
    }

    /// Run verification for the staged shadow. Staged -> Verified.
    pub fn verify<'tx>(
        &self,
        tx: &'tx mut Transaction,
        profile: &ProjectProfile,
    ) -> Result<&'tx VerificationReport, EngineError> {
        tx.expect_state(TxState::Staged, TxState::Verified)?;

        let report = stx_verify::verify(&tx.shadow, profile, &*self.invoker, &self.config.verify)?;
        tx.report = Some(report);
        tx.state = TxState::Verified;
        Ok(tx.report.as_ref().unwrap_or_else(|| unreachable!()))
    }

    /// Ask the governor for a verdict. Verified -> Decided.
    pub fn decide(&self, tx: &mut Transaction) -> Result<PolicyDecision, EngineError> {
        tx.expect_state(TxState::Verified, TxState::Decided)?;

        let report = tx.report.as_ref().unwrap_or_else(|| unreachable!());
        let decision = self.governor.decide(
            &tx.changeset,
            report,
            tx.mode,
            self.autonomous_streak.load(Ordering::SeqCst),
        );
        tx.decision = Some(decision.clone());
        tx.state = TxState::Decided;
        Ok(decision)
    }

    /// Drive a decided transaction to its terminal state.
    ///
    /// Deny discards. RequiresApproval waits on the approval channel,
    /// bounded by the configured timeout; rejection and expiry both
    /// discard. Allow (directly or via approval) commits.
    pub fn resolve(&self, tx: &mut Transaction) -> Result<TxOutcome, EngineError> {
        tx.expect_state(TxState::Decided, TxState::Committed)?;

        let decision = tx
            .decision
            .clone()
            .unwrap_or_else(|| unreachable!());

        match decision {
            PolicyDecision::Deny { reason } => {
                tx.state = TxState::Discarded;
                tracing::info!(tx_id = %tx.tx_id, %reason, "transaction denied and discarded");
                Ok(TxOutcome::Discarded(DiscardReason::Denied {
                    detail: reason,
                }))
            }
            PolicyDecision::RequiresApproval => {
                tracing::info!(
                    tx_id = %tx.tx_id,
                    timeout_secs = self.config.approval_timeout.as_secs(),
                    "awaiting approval"
                );
                match tx.gate.wait(self.config.approval_timeout) {
                    ApprovalSignal::Approved => self.commit(tx, true),
                    ApprovalSignal::Rejected => {
                        tx.state = TxState::Discarded;
                        Ok(TxOutcome::Discarded(DiscardReason::ApprovalRejected))
                    }
                    ApprovalSignal::TimedOut => {
                        tx.state = TxState::Discarded;
                        tracing::info!(tx_id = %tx.tx_id, "approval timed out, discarding");
                        Ok(TxOutcome::Discarded(DiscardReason::ApprovalTimeout))
                    }
                }
            }
            PolicyDecision::Allow => self.commit(tx, false),
        }
    }

    /// Cancel before commit begins. Any non-terminal state discards; a
    /// terminal transaction cannot be cancelled.
    pub fn cancel(&self, tx: &mut Transaction) -> Result<TxOutcome, EngineError> {
        match tx.state {
            TxState::Staged | TxState::Verified | TxState::Decided => {
                tx.state = TxState::Discarded;
                tracing::info!(tx_id = %tx.tx_id, "transaction cancelled");
                Ok(TxOutcome::Discarded(DiscardReason::Cancelled))
            }
            terminal => Err(EngineError::InvalidTransition {
                from: terminal,
                to: TxState::Discarded,
            }),
        }
    }

    /// Revert the real tree to a recorded snapshot.
    ///
    /// Builds the inverse change set and routes it through the ordinary
    /// stage -> verify -> commit pipeline (verification minimal: path
    /// re-validation and diff), so restoration gets commit-grade
    /// atomicity and its own snapshot.
    pub fn restore(&self, root: &Path, snapshot_id: Uuid) -> Result<TxOutcome, EngineError> {
        let lock = WorkspaceLock::acquire(root)?;
        let mut store = SnapshotStore::open(snapshot_log_path(&lock.root))?;
        let snapshot = store.load(snapshot_id)?;
        let inverse = snapshot.inverse_changeset();

        let shadow = stx_shadow::stage(&lock.root, &inverse)?;
        let report = stx_verify::verify_minimal(&shadow)?;
        if !report.all_passed() {
            let detail = report
                .failed_checks()
                .iter()
                .map(|check| format!("{}: {}", check.name, check.detail))
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(%snapshot_id, %detail, "restore failed verification, discarding");
            return Ok(TxOutcome::Discarded(DiscardReason::Denied { detail }));
        }

        let result = committer::commit(
            &shadow,
            inverse.changeset_id,
            &PolicyDecision::Allow,
            &mut store,
        )?;
        tracing::info!(%snapshot_id, "restore committed");
        Ok(TxOutcome::Committed(result))
    }

    fn commit(&self, tx: &mut Transaction, approved: bool) -> Result<TxOutcome, EngineError> {
        let mut store = SnapshotStore::open(snapshot_log_path(tx.shadow.real_root()))?;
        let result = committer::commit(
            &tx.shadow,
            tx.changeset.changeset_id,
            &PolicyDecision::Allow,
            &mut store,
        )?;

        // A human answered: the unattended streak resets. An autonomous
        // commit extends it.
        if approved {
            self.autonomous_streak.store(0, Ordering::SeqCst);
        } else {
            self.autonomous_streak.fetch_add(1, Ordering::SeqCst);
        }

        tx.state = TxState::Committed;
        Ok(TxOutcome::Committed(result))
    }
}
