//! CLI-based provisioning runner for `terraform` and compatible binaries.
//!
//! Commands are executed on a blocking task. Stdout and stderr are read on
//! separate threads so lines can be streamed to the log while they are captured.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RunConfiguration;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandOutput, ProvisioningRunner, TerraformCommand};

/// Environment variable overriding the binary name.
pub const BINARY_ENV_VAR: &str = "TFKIT_TERRAFORM_BINARY";

const DEFAULT_BINARY: &str = "terraform";

/// Terraform CLI runner options.
#[derive(Debug, Clone)]
pub struct TerraformCliOptions {
    /// Binary to execute (`terraform`, `tofu`, or a full path)
    pub binary: String,
    /// Forward command output to the log line by line
    pub stream_logs: bool,
}

impl Default for TerraformCliOptions {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            stream_logs: true,
        }
    }
}

impl TerraformCliOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the binary taken from `TFKIT_TERRAFORM_BINARY`, if set.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(binary) = std::env::var(BINARY_ENV_VAR) {
            if !binary.trim().is_empty() {
                options.binary = binary;
            }
        }
        options
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn stream_logs(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }
}

/// Runner that shells out to the terraform binary.
pub struct TerraformCli {
    options: TerraformCliOptions,
}

impl TerraformCli {
    pub fn new(options: TerraformCliOptions) -> Self {
        Self { options }
    }

    pub fn from_env() -> Self {
        Self::new(TerraformCliOptions::from_env())
    }

    pub fn binary(&self) -> &str {
        &self.options.binary
    }

    /// Build the argument list for a subcommand.
    pub fn build_args(&self, command: TerraformCommand, config: &RunConfiguration) -> Vec<String> {
        let mut args: Vec<String> = command.base_args().iter().map(|s| s.to_string()).collect();

        if config.no_color {
            args.push("-no-color".to_string());
        }

        if command.takes_variables() {
            args.extend(config.variable_args());
        }

        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.options.binary.clone();
        for arg in args {
            if arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    async fn execute(&self, args: &[String], config: &RunConfiguration) -> RunnerResult<CommandOutput> {
        let invocation = Invocation {
            binary: self.options.binary.clone(),
            args: args.to_vec(),
            working_dir: config.has_working_dir().then(|| config.working_dir.clone()),
            env: config.env_vars.clone(),
            stream_logs: self.options.stream_logs,
        };

        let started_at = Utc::now();
        let start = Instant::now();

        let (exit_code, stdout, stderr) = tokio::task::spawn_blocking(move || invocation.run())
            .await
            .map_err(|e| RunnerError::ExecutionFailed(format!("Command task failed: {}", e)))??;

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run a subcommand, retrying while its output matches a retryable error.
    async fn run_with_retry(
        &self,
        command: TerraformCommand,
        config: &RunConfiguration,
    ) -> RunnerResult<String> {
        let args = self.build_args(command, config);
        let cmd_str = self.format_command(&args);
        let mut attempt: u32 = 0;

        loop {
            info!("Running terraform {} in {:?}", command, config.working_dir);
            debug!("Command: {}", cmd_str);

            let output = self.execute(&args, config).await?;
            let combined = output.combined_output();

            if output.success() {
                debug!("terraform {} finished in {}ms", command, output.duration_ms);
                return Ok(combined);
            }

            if attempt < config.retries() {
                if let Some(reason) = config.retry_reason(&combined)? {
                    attempt += 1;
                    warn!(
                        "terraform {} failed with a retryable error ({}); retry {}/{} in {:?}",
                        command,
                        reason,
                        attempt,
                        config.retries(),
                        config.retry_pause()
                    );
                    tokio::time::sleep(config.retry_pause()).await;
                    continue;
                }
            }

            return Err(RunnerError::CommandFailed {
                command: cmd_str,
                exit_code: output.exit_code,
                output: combined,
            });
        }
    }

    /// Run a short command and return its stdout.
    fn run_simple_command(&self, args: &[&str]) -> RunnerResult<String> {
        let output = Command::new(&self.options.binary)
            .args(args)
            .output()
            .map_err(|e| spawn_error(&self.options.binary, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(RunnerError::ExecutionFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new(TerraformCliOptions::default())
    }
}

#[async_trait]
impl ProvisioningRunner for TerraformCli {
    async fn is_available(&self) -> bool {
        Command::new(&self.options.binary)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn version(&self) -> RunnerResult<String> {
        let output = self.run_simple_command(&["version"])?;
        Ok(output.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn init_and_plan(&self, config: &RunConfiguration) -> RunnerResult<String> {
        let init_output = self.run_with_retry(TerraformCommand::Init, config).await?;
        let plan_output = self.run_with_retry(TerraformCommand::Plan, config).await?;
        Ok(format!("{}\n{}", init_output, plan_output))
    }

    async fn apply(&self, config: &RunConfiguration) -> RunnerResult<String> {
        self.run_with_retry(TerraformCommand::Apply, config).await
    }

    async fn destroy(&self, config: &RunConfiguration) -> RunnerResult<String> {
        self.run_with_retry(TerraformCommand::Destroy, config).await
    }
}

/// Everything a blocking task needs to run one command.
struct Invocation {
    binary: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    stream_logs: bool,
}

impl Invocation {
    fn run(self) -> RunnerResult<(i64, String, String)> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.binary, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let stdout_handle = std::thread::spawn({
            let stream_logs = self.stream_logs;
            move || collect_lines(stdout, stream_logs)
        });
        let stderr_handle = std::thread::spawn({
            let stream_logs = self.stream_logs;
            move || collect_lines(stderr, stream_logs)
        });

        let status = child.wait().map_err(|e| {
            RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
        })?;

        let stdout_output = stdout_handle.join().unwrap_or_default();
        let stderr_output = stderr_handle.join().unwrap_or_default();

        let exit_code = status.code().unwrap_or(-1) as i64;

        Ok((exit_code, stdout_output, stderr_output))
    }
}

fn collect_lines(stream: impl Read, stream_logs: bool) -> String {
    let reader = BufReader::new(stream);
    let mut output = String::new();
    for line in reader.lines().map_while(Result::ok) {
        if stream_logs {
            info!(target: "tfkit::terraform", "{}", line);
        }
        output.push_str(&line);
        output.push('\n');
    }
    output
}

fn spawn_error(binary: &str, e: std::io::Error) -> RunnerError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RunnerError::BinaryNotAvailable(format!("'{}' was not found on PATH", binary))
    } else {
        RunnerError::ExecutionFailed(format!("Failed to spawn {}: {}", binary, e))
    }
}
