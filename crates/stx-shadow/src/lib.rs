//! # stx-shadow
//!
//! Copy-on-write shadow workspace for the shadowtx transaction engine.
//!
//! Staging never copies the project tree. The [`ShadowWorkspace`] is an
//! in-memory overlay index mapping each touched path to its staged state
//! (shadowed content or a deletion tombstone); untouched paths resolve to
//! the real tree on read. This keeps staging cheap and portable — no
//! OS-specific overlay filesystem features involved.
//!
//! ## Key components
//!
//! - [`stage`] — validates every target path (containment first, no partial
//!   state on violation) and folds a change set into an overlay index.
//! - [`ShadowWorkspace`] — the overlay index plus shadow-first reads and
//!   materialization for out-of-tree build checks.
//! - [`paths`] — lexical normalization and symlink containment checks.

pub mod error;
pub mod overlay;
pub mod paths;
pub mod stager;

pub use error::ShadowError;
pub use overlay::{Resolved, ShadowEntry, ShadowWorkspace};
pub use stager::stage;
