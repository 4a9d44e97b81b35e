// error.rs — Error types for the shadow workspace subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during staging and shadow reads.
#[derive(Debug, Error)]
pub enum ShadowError {
    /// A target path resolves outside the workspace root (security violation).
    #[error("path violation: '{path}' — {reason}")]
    PathViolation { path: String, reason: String },

    /// A rename source exists in neither shadow nor real tree.
    #[error("file not found in shadow or real tree: '{path}'")]
    FileNotFound { path: String },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
