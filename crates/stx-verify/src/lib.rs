//! # stx-verify
//!
//! Verification pipeline for the shadowtx transaction engine.
//!
//! [`verify`] runs a closed set of checks against a shadow workspace and
//! produces a [`VerificationReport`]: named check results plus a
//! deterministic, path-ordered unified diff. The check strategy is selected
//! from an enumerated [`ProjectKind`] supplied by an external detector —
//! never open-ended plugin dispatch.
//!
//! Build checks run against a materialized scratch copy of the shadow,
//! bounded by a timeout, and can never mutate the real tree. When no build
//! is recognized, compilation is skipped but path re-validation and diff
//! generation still run — verification is never a full no-op.

pub mod error;
pub mod invoker;
pub mod project;
pub mod report;
pub mod verifier;

pub use error::VerifyError;
pub use invoker::{BuildInvoker, BuildOutcome, ProcessInvoker};
pub use project::{BuildCommand, ProjectKind, ProjectProfile};
pub use report::{CheckResult, VerificationReport};
pub use verifier::{
    verify, verify_minimal, VerifyConfig, BUILD_CHECK, MANIFEST_CHECK, PATH_SAFETY_CHECK,
};
