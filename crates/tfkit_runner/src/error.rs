//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while driving the provisioning binary.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Terraform not available: {0}")]
    BinaryNotAvailable(String),

    #[error("`{command}` exited with code {exit_code}")]
    CommandFailed {
        command: String,
        exit_code: i64,
        output: String,
    },

    #[error("Invalid retryable error pattern '{pattern}': {source}")]
    InvalidRetryPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl RunnerError {
    /// Combined stdout/stderr captured before the failure, if any.
    pub fn output(&self) -> &str {
        match self {
            RunnerError::CommandFailed { output, .. } => output,
            _ => "",
        }
    }

    /// Exit code of the failed command, if the command ran at all.
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            RunnerError::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
