//! # stx-changeset
//!
//! Change-set data model for the shadowtx transaction engine.
//!
//! A [`ChangeSet`] is the caller-supplied proposal for one transaction: an
//! ordered sequence of file operations (write, delete, rename) against a
//! workspace root. It is constructed once and never modified after staging —
//! the content hash makes any later tampering detectable.
//!
//! This crate also owns the deterministic line-based unified diff used by
//! the verifier ([`diff`]); it has no opinion about *where* files live and
//! performs no I/O.

pub mod changeset;
pub mod diff;

pub use changeset::{ChangeSet, FileOp};
