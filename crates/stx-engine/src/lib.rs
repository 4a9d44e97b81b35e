//! # stx-engine
//!
//! The speculative transaction engine of shadowtx.
//!
//! A caller-supplied change set is staged into a copy-on-write shadow
//! workspace, verified by a closed check pipeline, gated by the policy
//! governor, and — given an Allow — atomically committed to the real tree
//! with a durable pre-image snapshot recorded first. Denied, rejected,
//! timed-out, and cancelled transactions discard: the real tree stays
//! byte-for-byte unchanged.
//!
//! ## Shape of a transaction
//!
//! ```rust,no_run
//! use stx_changeset::{ChangeSet, FileOp};
//! use stx_engine::{Engine, EngineConfig};
//! use stx_policy::OperatingMode;
//! use stx_verify::ProjectProfile;
//!
//! let engine = Engine::new(EngineConfig::default());
//! let changeset = ChangeSet::new(vec![FileOp::Write {
//!     path: "src/lib.rs".to_string(),
//!     content: "pub fn answer() -> u32 { 42 }\n".to_string(),
//! }]);
//!
//! let mut tx = engine
//!     .begin("/path/to/project".as_ref(), changeset, OperatingMode::Autonomous)
//!     .unwrap();
//! engine.verify(&mut tx, &ProjectProfile::unrecognized()).unwrap();
//! engine.decide(&mut tx).unwrap();
//! let outcome = engine.resolve(&mut tx).unwrap();
//! assert!(outcome.is_committed());
//! ```
//!
//! At most one transaction is in flight per workspace; the handle owns the
//! workspace lock and releases it on drop. Only the committer writes the
//! real tree, and only while that lock is held with an Allow in hand.

pub mod approval;
pub mod committer;
pub mod error;
pub mod transaction;

pub use approval::{ApprovalGate, ApprovalHandle, ApprovalSignal};
pub use committer::CommitResult;
pub use error::{DiscardReason, EngineError, TxOutcome};
pub use transaction::{snapshot_log_path, Engine, EngineConfig, Transaction, TxState};
