//! # tfkit_runner
//!
//! Terraform command execution wrapper for tfkit.
//!
//! This crate drives the provisioning binary on behalf of the test harness.
//! Everything it knows about terraform is how to invoke it and how to tell a
//! transient failure from a real one.
//!
//! # Features
//!
//! - **Run Configuration**: working directory, variables and retry policy for one test
//! - **CLI Runner**: `terraform`/`tofu` execution with streamed, captured output
//! - **Retryable Errors**: regex-matched transient failures are retried
//! - **Mock Runner**: For testing without a terraform binary
//!
//! # Example
//!
//! ```rust,no_run
//! use tfkit_runner::{ProvisioningRunner, RunConfiguration, TerraformCli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = TerraformCli::from_env();
//!
//!     let config = runner.with_default_retryable_errors(
//!         RunConfiguration::new()
//!             .working_dir("./modules/bucket")
//!             .var("name", "demo"),
//!     );
//!
//!     let plan = runner.init_and_plan(&config).await?;
//!     println!("{}", plan);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::{TerraformCli, TerraformCliOptions, BINARY_ENV_VAR};
pub use config::{RunConfiguration, DEFAULT_RETRYABLE_ERRORS};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{CommandOutput, ProvisioningRunner, TerraformCommand};
