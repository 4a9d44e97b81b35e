//! # stx-policy
//!
//! The Governor — the "default deny" policy gate of the shadowtx engine.
//!
//! [`Governor::decide`] is a pure function of the change set, the
//! verification report, the operating mode, and the caller-maintained
//! autonomous commit streak. It never touches the filesystem and never
//! blocks; waiting for an approval signal is the engine's job, triggered
//! by a [`PolicyDecision::RequiresApproval`] result.
//!
//! The deny rules are deliberately conservative and fully enumerated:
//! containment violations, a small destructive-pattern set, and any failed
//! verification check are unconditional denials — a failed build never
//! escalates to approval.

pub mod governor;
pub mod rules;

pub use governor::{Governor, GovernorConfig, OperatingMode, PolicyDecision};
