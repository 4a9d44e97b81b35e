// error.rs — Error types for the snapshot subsystem.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while recording or loading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Failed to open or create the snapshot log file.
    #[error("failed to open snapshot log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read or write the log.
    #[error("snapshot log i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in the log, or a record that would not serialize.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No snapshot with the given id exists in the log.
    #[error("snapshot {id} not found")]
    NotFound { id: Uuid },
}
