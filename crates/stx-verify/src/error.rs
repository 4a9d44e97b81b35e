// error.rs — Error types for the verification subsystem.
//
// Check failures are not errors: a failed build lands in the report as a
// failed CheckResult. VerifyError covers infrastructure failures only —
// the scratch directory, process spawning, shadow reads.

use std::path::PathBuf;
use thiserror::Error;

use stx_shadow::ShadowError;

/// Infrastructure errors during verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Reading the shadow or real tree failed.
    #[error(transparent)]
    Shadow(#[from] ShadowError),

    /// Scratch directory or process I/O failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
