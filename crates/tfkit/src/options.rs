//! Effective run configuration for a test.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tfkit_runner::RunConfiguration;

use crate::context::TestContext;
use crate::error::HarnessResult;

/// Folder (next to the test) holding per-test variable files.
pub const VARIABLES_DIR: &str = "variables";

/// Finalize `config` for the test described by `ctx`.
///
/// - An unset working directory defaults to the parent of the test directory,
///   since tests live one level below the module root. A relative one is
///   resolved against the test directory.
/// - `variables/<test name>.tfvars` next to the test is appended to the var
///   files if it exists.
/// - The module is copied to a temporary folder so parallel tests never share
///   a working directory, and the configuration is pointed at the copy.
/// - The runner's default retryable errors are installed.
pub fn default_options(ctx: &TestContext, mut config: RunConfiguration) -> HarnessResult<RunConfiguration> {
    let test_dir = ctx.test_dir()?;

    if !config.has_working_dir() {
        config.working_dir = test_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| test_dir.clone());
        debug!("No working directory set, using {:?}", config.working_dir);
    } else if config.working_dir.is_relative() {
        config.working_dir = test_dir.join(&config.working_dir);
    }

    let var_file = test_dir
        .join(VARIABLES_DIR)
        .join(format!("{}.tfvars", ctx.name()));
    if var_file.is_file() {
        let reference = relative_to(&var_file, &config.working_dir);
        if !config.var_files.contains(&reference) {
            info!("Using variable file {:?} for test '{}'", reference, ctx.name());
            config.var_files.push(reference);
        }
    }

    config.working_dir = ctx
        .store()
        .copy_working_tree_to_temp(&config.working_dir, ctx.name())?;

    Ok(ctx.runner().with_default_retryable_errors(config))
}

/// `path` relative to `base` when it lives inside it, otherwise unchanged.
///
/// Terraform resolves var files against its working directory, and the
/// working copy mirrors the module tree, so in-module paths stay valid there.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/m/test/variables/a.tfvars"), Path::new("/m")),
            PathBuf::from("test/variables/a.tfvars")
        );
        assert_eq!(
            relative_to(Path::new("/elsewhere/a.tfvars"), Path::new("/m")),
            PathBuf::from("/elsewhere/a.tfvars")
        );
    }
}
