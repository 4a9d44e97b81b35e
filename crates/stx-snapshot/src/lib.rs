//! # stx-snapshot
//!
//! Durable pre-image snapshots for the shadowtx transaction engine.
//!
//! Before a commit mutates the real tree, the committer captures the prior
//! content of every touched path into a [`Snapshot`] and appends it to a
//! [`SnapshotStore`] — a JSONL (JSON Lines) log, one record per line,
//! flushed per append. Records stay until explicitly pruned.
//!
//! A snapshot knows how to undo itself: [`Snapshot::inverse_changeset`]
//! produces the change set that restores the pre-commit state, which the
//! engine routes through the ordinary stage/verify/commit pipeline.

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::SnapshotError;
pub use snapshot::Snapshot;
pub use store::SnapshotStore;
