//! Lifecycle stages of a terraform test.
//!
//! Each stage runs at most once per test through the context's stage store,
//! which also lets a developer skip stages while iterating locally (see
//! [`tfkit_stage`]).

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use tfkit_runner::{RunConfiguration, RunnerError, RunnerResult};
use tfkit_stage::{run_stage, StageError, StageName};

use crate::cleanup::cleanup;
use crate::context::TestContext;
use crate::error::{HarnessError, HarnessResult};

/// Provider configuration picked up from the test directory.
pub const PROVIDER_FILE: &str = "provider.tf";

/// Name the provider configuration gets inside the working directory.
pub const COPIED_PROVIDER_FILE: &str = "test-provider.tf";

/// Output fragments that mean terraform is talking to a remote backend.
const REMOTE_BACKEND_MARKERS: &[&str] = &["backend \"remote\"", "Running plan in the remote backend"];

/// Decides what to do with a failed terraform command.
///
/// Receives the error and the command's combined output. Returning `Ok(())`
/// accepts the failure and lets the stage succeed.
pub type ErrorHandler<'a> = Box<dyn FnOnce(&RunnerError, &str) -> anyhow::Result<()> + Send + 'a>;

/// Checks the deployed infrastructure.
pub type ValidateFn<'a> = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'a>;

/// Box a closure as an [`ErrorHandler`].
pub fn error_handler<'a, F>(handler: F) -> ErrorHandler<'a>
where
    F: FnOnce(&RunnerError, &str) -> anyhow::Result<()> + Send + 'a,
{
    Box::new(handler)
}

/// Box a closure as a [`ValidateFn`].
pub fn validation<'a, F>(validate: F) -> ValidateFn<'a>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'a,
{
    Box::new(validate)
}

/// Runs the stages of one test.
pub struct StageRunner<'a> {
    ctx: &'a TestContext,
}

impl<'a> StageRunner<'a> {
    pub(crate) fn new(ctx: &'a TestContext) -> Self {
        Self { ctx }
    }

    /// Copy the provider configuration, save `config` for later stages, run
    /// `terraform init` and `terraform plan`, and refuse to continue if the
    /// module uses a remote backend.
    ///
    /// A failed command goes to `on_error` when given, otherwise it fails the
    /// stage.
    pub async fn setup(
        &self,
        working_dir: &Path,
        config: &RunConfiguration,
        on_error: Option<ErrorHandler<'_>>,
    ) -> HarnessResult<()> {
        self.copy_provider_file(working_dir)?;

        let store = self.ctx.store();
        let runner = self.ctx.runner();

        run_stage(store, StageName::Setup, async move {
            store.save_config(working_dir, config)?;

            let result = runner.init_and_plan(config).await;

            let output = match &result {
                Ok(output) => output.as_str(),
                Err(err) => err.output(),
            };
            if uses_remote_backend(output) {
                error!("Plan is running in remote backend for {:?}", working_dir);
                return Err(HarnessError::RemoteBackend {
                    working_dir: working_dir.to_path_buf(),
                });
            }

            handle_result(result, on_error)
        })
        .await?;

        Ok(())
    }

    /// Run `terraform apply` with the configuration saved during setup.
    pub async fn apply(&self, working_dir: &Path, on_error: Option<ErrorHandler<'_>>) -> HarnessResult<()> {
        let store = self.ctx.store();
        let runner = self.ctx.runner();

        run_stage(store, StageName::Apply, async move {
            let config = store.load_config(working_dir)?;
            let result = runner.apply(&config).await;
            handle_result(result, on_error)
        })
        .await?;

        Ok(())
    }

    /// Run the validation callback, if any.
    pub async fn validate(&self, validate: Option<ValidateFn<'_>>) -> HarnessResult<()> {
        let Some(validate) = validate else {
            debug!("No validation supplied for '{}'", self.ctx.name());
            return Ok(());
        };

        run_stage(self.ctx.store(), StageName::Validate, async move {
            validate().map_err(HarnessError::Validation)
        })
        .await?;

        Ok(())
    }

    /// Run `terraform destroy`, then remove the test data folder and the copied
    /// provider configuration.
    ///
    /// Cleanup happens even when destroy fails; the destroy error is reported
    /// afterwards.
    pub async fn destroy(&self, working_dir: &Path) -> HarnessResult<()> {
        let ctx = self.ctx;
        let store = ctx.store();
        let runner = ctx.runner();

        run_stage(store, StageName::Destroy, async move {
            let destroyed = match store.load_config(working_dir) {
                Ok(config) => runner
                    .destroy(&config)
                    .await
                    .map(|_| ())
                    .map_err(HarnessError::from),
                Err(StageError::ConfigNotFound(path)) => {
                    warn!("No saved configuration at {:?}; nothing to destroy", path);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            };

            cleanup(ctx, working_dir);
            destroyed
        })
        .await?;

        Ok(())
    }

    fn copy_provider_file(&self, working_dir: &Path) -> HarnessResult<()> {
        let source = self.ctx.test_dir()?.join(PROVIDER_FILE);
        if !source.is_file() {
            debug!("No {} next to the test, skipping copy", PROVIDER_FILE);
            return Ok(());
        }

        let target = working_dir.join(COPIED_PROVIDER_FILE);
        fs::copy(&source, &target).map_err(|source_err| HarnessError::ProviderCopy {
            path: source.clone(),
            source: source_err,
        })?;
        info!("Copied {:?} to {:?}", source, target);
        Ok(())
    }
}

fn uses_remote_backend(output: &str) -> bool {
    REMOTE_BACKEND_MARKERS.iter().any(|marker| output.contains(marker))
}

/// Route a failed command to the error handler, or fail with it.
fn handle_result(result: RunnerResult<String>, on_error: Option<ErrorHandler<'_>>) -> HarnessResult<()> {
    match (result, on_error) {
        (Ok(_), _) => Ok(()),
        (Err(err), Some(handler)) => {
            warn!("{}; passing it to the error handler", err);
            handler(&err, err.output()).map_err(HarnessError::ErrorHandler)
        }
        (Err(err), None) => Err(err.into()),
    }
}
