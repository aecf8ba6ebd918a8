//! Full test lifecycles.
//!
//! Each entry point finalizes the configuration, then runs setup, apply and
//! validate. Destroy always runs afterwards: after a stage error, and after a
//! panic in a callback (the panic is resumed once teardown is done).

use std::panic::AssertUnwindSafe;
use std::path::Path;

use futures_util::FutureExt;
use tracing::{error, info, warn};

use tfkit_runner::RunConfiguration;
use tfkit_stage::StageName;

use crate::context::TestContext;
use crate::error::HarnessResult;
use crate::options::default_options;
use crate::stages::validation;

/// Apply and destroy the module with `config`, running `validate` in between.
pub async fn run_options_validate<F>(ctx: &TestContext, config: RunConfiguration, validate: F) -> HarnessResult<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    let config = default_options(ctx, config)?;
    let working_dir = config.working_dir.clone();
    let stages = ctx.stages();

    info!("Running test '{}' in {:?}", ctx.name(), working_dir);

    let outcome = AssertUnwindSafe(async {
        stages.setup(&working_dir, &config, None).await?;
        stages.apply(&working_dir, None).await?;
        stages.validate(Some(validation(validate))).await
    })
    .catch_unwind()
    .await;

    let teardown = teardown(ctx, &working_dir).await;

    match outcome {
        Err(panic) => {
            if let Err(e) = teardown {
                error!("Teardown after panic failed: {}", e);
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(teardown_err) = teardown {
                error!("Teardown after failed stage also failed: {}", teardown_err);
            }
            Err(e)
        }
        Ok(Ok(())) => teardown,
    }
}

/// Apply and destroy the module with default configuration, running
/// `validate` in between.
pub async fn run_validate<F>(ctx: &TestContext, validate: F) -> HarnessResult<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    run_options_validate(ctx, RunConfiguration::new(), validate).await
}

/// Apply and destroy the module with default configuration.
pub async fn run_no_validate(ctx: &TestContext) -> HarnessResult<()> {
    run_options_validate(ctx, RunConfiguration::new(), || Ok(())).await
}

/// Apply and destroy the module with `config`.
///
/// For tests that only need terraform to succeed, without further checks.
pub async fn run_options_no_validate(ctx: &TestContext, config: RunConfiguration) -> HarnessResult<()> {
    run_options_validate(ctx, config, || Ok(())).await
}

/// Destroy, then release the working copy once infrastructure is gone.
async fn teardown(ctx: &TestContext, working_dir: &Path) -> HarnessResult<()> {
    if let Err(e) = ctx.stages().destroy(working_dir).await {
        error!("Destroy failed; keeping {:?} so leftover state can be recovered", working_dir);
        return Err(e);
    }

    if ctx.store().is_complete(StageName::Destroy) {
        if let Err(e) = ctx.store().release_working_copy(working_dir) {
            warn!("Could not remove working copy {:?}: {}", working_dir, e);
        }
    } else {
        info!("Destroy was skipped; keeping {:?}", working_dir);
    }

    Ok(())
}
