//! Run configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Default number of retries installed by `with_default_retryable_errors`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between retries.
pub const DEFAULT_TIME_BETWEEN_RETRIES: Duration = Duration::from_secs(5);

const NETWORK_PLUGIN_ERROR: &str = "Failed to retrieve plugin due to transient network error.";

/// Known transient terraform failures, as (pattern, description) pairs.
pub const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (".*read: connection reset by peer.*", "Failed to reach helm charts repository."),
    (".*transport is closing.*", "Failed to reach Kubernetes API."),
    (".*unable to verify signature.*", NETWORK_PLUGIN_ERROR),
    (".*unable to verify checksum.*", NETWORK_PLUGIN_ERROR),
    (".*no provider exists with the given name.*", NETWORK_PLUGIN_ERROR),
    (".*registry service is unreachable.*", NETWORK_PLUGIN_ERROR),
    (".*Error installing provider.*", NETWORK_PLUGIN_ERROR),
    (".*Failed to query available provider packages.*", NETWORK_PLUGIN_ERROR),
    (".*timeout while waiting for plugin to start.*", NETWORK_PLUGIN_ERROR),
    (".*timed out waiting for server handshake.*", NETWORK_PLUGIN_ERROR),
    ("could not query provider registry for", NETWORK_PLUGIN_ERROR),
    (
        ".*Provider produced inconsistent result after apply.*",
        "Provider eventual consistency error.",
    ),
];

/// Parameters governing one test's provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    /// Directory terraform runs in. Empty means "not set yet".
    pub working_dir: PathBuf,
    /// `-var-file` arguments, in order.
    pub var_files: Vec<PathBuf>,
    /// `-var` arguments. Strings are passed raw, everything else as JSON.
    pub vars: BTreeMap<String, serde_json::Value>,
    /// Extra environment for the terraform process.
    pub env_vars: BTreeMap<String, String>,
    /// Output patterns (regular expressions) that make a failed command retryable.
    pub retryable_errors: BTreeMap<String, String>,
    /// Retries for a retryable failure. `None` until set or defaulted.
    pub max_retries: Option<u32>,
    pub time_between_retries: Option<Duration>,
    /// Pass `-no-color` to commands that accept it.
    pub no_color: bool,
}

impl RunConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn var_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.var_files.push(path.into());
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn retryable_error(mut self, pattern: impl Into<String>, description: impl Into<String>) -> Self {
        self.retryable_errors.insert(pattern.into(), description.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn time_between_retries(mut self, pause: Duration) -> Self {
        self.time_between_retries = Some(pause);
        self
    }

    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Whether a working directory has been set.
    pub fn has_working_dir(&self) -> bool {
        !self.working_dir.as_os_str().is_empty()
    }

    /// Retries allowed for a retryable failure; none when unset.
    pub fn retries(&self) -> u32 {
        self.max_retries.unwrap_or(0)
    }

    pub fn retry_pause(&self) -> Duration {
        self.time_between_retries.unwrap_or(Duration::ZERO)
    }

    /// Install the default retryable errors and retry policy.
    ///
    /// Patterns already present keep their descriptions. A retry count or pause
    /// that was set explicitly, including zero, is left alone.
    pub fn with_default_retryable_errors(mut self) -> Self {
        for (pattern, description) in DEFAULT_RETRYABLE_ERRORS {
            self.retryable_errors
                .entry(pattern.to_string())
                .or_insert_with(|| description.to_string());
        }
        self.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
        self.time_between_retries.get_or_insert(DEFAULT_TIME_BETWEEN_RETRIES);
        self
    }

    /// Find the description of the first retryable pattern matching `output`.
    pub fn retry_reason(&self, output: &str) -> RunnerResult<Option<&str>> {
        for (pattern, description) in &self.retryable_errors {
            let re = Regex::new(pattern).map_err(|source| RunnerError::InvalidRetryPattern {
                pattern: pattern.clone(),
                source,
            })?;
            if re.is_match(output) {
                return Ok(Some(description.as_str()));
            }
        }
        Ok(None)
    }

    /// `-var` and `-var-file` arguments, in the order terraform expects them.
    pub fn variable_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for (key, value) in &self.vars {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            args.push("-var".to_string());
            args.push(format!("{}={}", key, rendered));
        }

        for file in &self.var_files {
            args.push("-var-file".to_string());
            args.push(file.to_string_lossy().to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = RunConfiguration::new()
            .working_dir("/tmp/module")
            .var_file("test/variables/a.tfvars")
            .var("region", "eu-west-1")
            .env("TF_LOG", "DEBUG")
            .no_color();

        assert!(config.has_working_dir());
        assert_eq!(config.var_files, vec![PathBuf::from("test/variables/a.tfvars")]);
        assert_eq!(config.env_vars.get("TF_LOG"), Some(&"DEBUG".to_string()));
        assert!(config.no_color);
    }

    #[test]
    fn test_default_retryable_errors_keep_caller_entries() {
        let config = RunConfiguration::new()
            .retryable_error(".*transport is closing.*", "custom")
            .max_retries(7)
            .with_default_retryable_errors();

        assert_eq!(config.retryable_errors.len(), DEFAULT_RETRYABLE_ERRORS.len());
        assert_eq!(
            config.retryable_errors.get(".*transport is closing.*"),
            Some(&"custom".to_string())
        );
        assert_eq!(config.max_retries, Some(7));
        assert_eq!(config.retry_pause(), DEFAULT_TIME_BETWEEN_RETRIES);
    }

    #[test]
    fn test_explicit_zero_retries_survive_defaults() {
        let config = RunConfiguration::new()
            .max_retries(0)
            .time_between_retries(Duration::from_millis(500))
            .with_default_retryable_errors();

        assert_eq!(config.retries(), 0);
        assert_eq!(config.retry_pause(), Duration::from_millis(500));
    }

    #[test]
    fn test_unset_retries_get_defaults() {
        let config = RunConfiguration::new().with_default_retryable_errors();

        assert_eq!(config.retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_pause(), DEFAULT_TIME_BETWEEN_RETRIES);
    }

    #[test]
    fn test_retry_reason() {
        let config = RunConfiguration::new().with_default_retryable_errors();

        let reason = config
            .retry_reason("Error: Failed to query available provider packages\n")
            .unwrap();
        assert_eq!(reason, Some(NETWORK_PLUGIN_ERROR));

        assert_eq!(config.retry_reason("Error: Invalid reference").unwrap(), None);
    }

    #[test]
    fn test_invalid_retry_pattern() {
        let config = RunConfiguration::new().retryable_error("(unclosed", "broken");
        let err = config.retry_reason("anything").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidRetryPattern { .. }));
    }

    #[test]
    fn test_variable_args() {
        let config = RunConfiguration::new()
            .var("name", "demo")
            .var("count", 2)
            .var_file("vars.tfvars");

        assert_eq!(
            config.variable_args(),
            vec!["-var", "count=2", "-var", "name=demo", "-var-file", "vars.tfvars"]
        );
    }

    #[test]
    fn test_serde_roundtrip_with_missing_fields() {
        let config: RunConfiguration =
            serde_json::from_str(r#"{"working_dir": "/tmp/x", "var_files": ["a.tfvars"]}"#).unwrap();
        assert_eq!(config.working_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.max_retries, None);
        assert!(config.retryable_errors.is_empty());
    }
}
