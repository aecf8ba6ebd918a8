//! Mock provisioning runner for testing.
//!
//! Provides a configurable mock implementation of the ProvisioningRunner trait
//! for use in tests without requiring a terraform binary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::RunConfiguration;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ProvisioningRunner, TerraformCommand};

/// Predefined mock response for a terraform command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub output: String,
}

impl MockResponse {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
        }
    }

    pub fn failure(exit_code: i64, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub working_dir: PathBuf,
    pub var_files: Vec<PathBuf>,
    pub max_retries: u32,
}

/// Mock provisioning runner for testing.
///
/// This runner captures all calls and returns predefined responses per
/// command, allowing tests to verify stage sequencing without running
/// terraform. Commands without a scripted response succeed with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    /// Queued responses per command, consumed front to back. The last
    /// response for a command is repeated once the queue runs dry.
    responses: Arc<RwLock<HashMap<TerraformCommand, Vec<MockResponse>>>>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Whether the runner should report as available.
    unavailable: Arc<RwLock<bool>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call of `command`.
    pub fn respond(self, command: TerraformCommand, response: MockResponse) -> Self {
        self.responses.write().entry(command).or_default().push(response);
        self
    }

    /// Report the binary as missing.
    pub fn set_unavailable(self) -> Self {
        *self.unavailable.write() = true;
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Names of the called methods, in call order.
    pub fn call_sequence(&self) -> Vec<String> {
        self.captured_calls.read().iter().map(|c| c.method.clone()).collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn record_call(&self, method: &str, config: &RunConfiguration) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            working_dir: config.working_dir.clone(),
            var_files: config.var_files.clone(),
            max_retries: config.retries(),
        });
    }

    fn next_response(&self, command: TerraformCommand) -> MockResponse {
        let mut responses = self.responses.write();
        match responses.get_mut(&command) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue.first().cloned().unwrap_or_else(|| MockResponse::success("")),
            None => MockResponse::success(""),
        }
    }

    fn run(&self, command: TerraformCommand) -> RunnerResult<String> {
        if *self.unavailable.read() {
            return Err(RunnerError::BinaryNotAvailable("mock runner is unavailable".to_string()));
        }

        let response = self.next_response(command);
        if response.exit_code == 0 {
            Ok(response.output)
        } else {
            Err(RunnerError::CommandFailed {
                command: format!("terraform {}", command),
                exit_code: response.exit_code,
                output: response.output,
            })
        }
    }
}

#[async_trait]
impl ProvisioningRunner for MockRunner {
    async fn is_available(&self) -> bool {
        !*self.unavailable.read()
    }

    async fn version(&self) -> RunnerResult<String> {
        Ok("Terraform v0.0.0-mock".to_string())
    }

    async fn init_and_plan(&self, config: &RunConfiguration) -> RunnerResult<String> {
        self.record_call("init_and_plan", config);
        let init_output = self.run(TerraformCommand::Init)?;
        let plan_output = self.run(TerraformCommand::Plan)?;
        Ok(format!("{}\n{}", init_output, plan_output))
    }

    async fn apply(&self, config: &RunConfiguration) -> RunnerResult<String> {
        self.record_call("apply", config);
        self.run(TerraformCommand::Apply)
    }

    async fn destroy(&self, config: &RunConfiguration) -> RunnerResult<String> {
        self.record_call("destroy", config);
        self.run(TerraformCommand::Destroy)
    }
}
