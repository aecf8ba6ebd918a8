//! Provisioning runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::RunConfiguration;
use crate::error::RunnerResult;

/// Terraform subcommands driven by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerraformCommand {
    Init,
    Plan,
    Apply,
    Destroy,
}

impl TerraformCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerraformCommand::Init => "init",
            TerraformCommand::Plan => "plan",
            TerraformCommand::Apply => "apply",
            TerraformCommand::Destroy => "destroy",
        }
    }

    /// Fixed flags for the subcommand, before variables are appended.
    pub fn base_args(&self) -> &'static [&'static str] {
        match self {
            TerraformCommand::Init => &["init", "-input=false", "-upgrade=false"],
            TerraformCommand::Plan => &["plan", "-input=false", "-lock=false"],
            TerraformCommand::Apply => &["apply", "-input=false", "-auto-approve", "-lock=false"],
            TerraformCommand::Destroy => &["destroy", "-input=false", "-auto-approve"],
        }
    }

    /// Whether the subcommand takes `-var` / `-var-file` arguments.
    pub fn takes_variables(&self) -> bool {
        !matches!(self, TerraformCommand::Init)
    }
}

impl std::fmt::Display for TerraformCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a single terraform invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the process
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// The wrapped provisioning tool.
///
/// Every operation returns the combined stdout/stderr text. A non-zero exit
/// surfaces as [`RunnerError::CommandFailed`](crate::RunnerError::CommandFailed),
/// which still carries the captured output.
#[async_trait]
pub trait ProvisioningRunner: Send + Sync {
    /// Check if the binary can be executed.
    async fn is_available(&self) -> bool;

    /// Version banner reported by the binary.
    async fn version(&self) -> RunnerResult<String>;

    /// Run `init` followed by `plan`. Returns the plan output, or the init
    /// failure if init did not succeed.
    async fn init_and_plan(&self, config: &RunConfiguration) -> RunnerResult<String>;

    /// Run `apply`.
    async fn apply(&self, config: &RunConfiguration) -> RunnerResult<String>;

    /// Run `destroy`.
    async fn destroy(&self, config: &RunConfiguration) -> RunnerResult<String>;

    /// Configuration with the runner's known transient errors installed.
    fn with_default_retryable_errors(&self, config: RunConfiguration) -> RunConfiguration {
        config.with_default_retryable_errors()
    }
}
