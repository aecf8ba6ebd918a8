//! Error types for stage bookkeeping.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for stage store operations.
pub type StageResult<T> = Result<T, StageError>;

/// Errors that can occur while persisting or staging test state.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("No saved configuration at {0}; did the setup stage run?")]
    ConfigNotFound(PathBuf),

    #[error("Failed to copy {source_dir} to a temporary folder: {source}")]
    CopyFailed {
        source_dir: PathBuf,
        #[source]
        source: Box<StageError>,
    },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
