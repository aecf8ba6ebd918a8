//! # tfkit
//!
//! Staged testing helpers for terraform modules.
//!
//! A test copies its module to a temporary folder, runs `init`/`plan`,
//! `apply`, an optional validation callback, and always finishes with
//! `destroy`. The staging is the interesting part; terraform itself does the
//! provisioning.
//!
//! ## Layout
//!
//! Tests are expected to live one directory below the module root:
//!
//! ```text
//! module/
//! ├── main.tf
//! └── test/
//!     ├── provider.tf              # copied in as test-provider.tf, optional
//!     ├── variables/
//!     │   └── bucket_is_private.tfvars  # picked up by the test of that name
//!     └── bucket_test.rs
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tfkit::{run_options_validate, TestContext};
//! use tfkit_runner::RunConfiguration;
//!
//! #[tokio::test]
//! async fn bucket_is_private() -> anyhow::Result<()> {
//!     let ctx = TestContext::current();
//!     let config = RunConfiguration::new().var("name", "tfkit-demo");
//!
//!     run_options_validate(&ctx, config, || {
//!         // inspect the deployed bucket here
//!         Ok(())
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! For finer control, drive the stages directly with [`StageRunner`]. Each
//! stage runs once per test and can be skipped with `SKIP_<stage>` while
//! iterating locally (e.g. `SKIP_destroy=1` to keep infrastructure around).

pub mod cleanup;
pub mod context;
pub mod error;
pub mod logging;
pub mod options;
pub mod run;
pub mod stages;

pub use cleanup::cleanup;
pub use context::TestContext;
pub use error::{HarnessError, HarnessResult};
pub use options::{default_options, VARIABLES_DIR};
pub use run::{run_no_validate, run_options_no_validate, run_options_validate, run_validate};
pub use stages::{
    error_handler, validation, ErrorHandler, StageRunner, ValidateFn, COPIED_PROVIDER_FILE, PROVIDER_FILE,
};
