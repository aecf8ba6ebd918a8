//! Error types for the test harness.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that fail a test run.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Could not get current working directory, aborting test: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Could not copy {} into the working directory, aborting test: {source}", .path.display())]
    ProviderCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("terraform is configured with remote backend in {}; refusing to run", .working_dir.display())]
    RemoteBackend { working_dir: PathBuf },

    #[error("Error handler rejected the failure: {0:#}")]
    ErrorHandler(#[source] anyhow::Error),

    #[error("Validation failed: {0:#}")]
    Validation(#[source] anyhow::Error),

    #[error("Runner error: {0}")]
    Runner(#[from] tfkit_runner::RunnerError),

    #[error("Stage error: {0}")]
    Stage(#[from] tfkit_stage::StageError),
}
