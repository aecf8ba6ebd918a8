//! Per-test context.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tfkit_runner::{ProvisioningRunner, TerraformCli};
use tfkit_stage::{FsStageStore, StageStore};

use crate::error::{HarnessError, HarnessResult};
use crate::logging;
use crate::stages::StageRunner;

/// Everything a single test needs: its identity, where it lives, the runner
/// that drives terraform and the store that tracks its stages.
///
/// Create one per test. Contexts are never shared between tests.
pub struct TestContext {
    name: String,
    test_dir: Option<PathBuf>,
    runner: Arc<dyn ProvisioningRunner>,
    store: Arc<dyn StageStore>,
}

impl TestContext {
    /// Context using the terraform CLI and a filesystem stage store, both
    /// configured from the environment.
    pub fn new(name: impl Into<String>) -> Self {
        logging::init();

        Self {
            name: name.into(),
            test_dir: None,
            runner: Arc::new(TerraformCli::from_env()),
            store: Arc::new(FsStageStore::from_env()),
        }
    }

    /// Context named after the running test.
    ///
    /// The test harness names each test thread after its test path, e.g.
    /// `tests::bucket_is_private`. The last path segment is used.
    pub fn current() -> Self {
        let thread = std::thread::current();
        let name = thread
            .name()
            .and_then(|n| n.rsplit("::").next())
            .filter(|n| !n.is_empty() && *n != "main")
            .unwrap_or("tfkit")
            .to_string();
        Self::new(name)
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProvisioningRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn StageStore>) -> Self {
        self.store = store;
        self
    }

    /// Directory the test lives in. Defaults to the process current directory.
    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the test directory to an absolute path.
    ///
    /// A relative directory is taken from the process current directory.
    pub fn test_dir(&self) -> HarnessResult<PathBuf> {
        match &self.test_dir {
            Some(dir) if dir.is_absolute() => Ok(dir.clone()),
            Some(dir) => {
                let cwd = std::env::current_dir().map_err(HarnessError::CurrentDir)?;
                Ok(absolute(&cwd, dir))
            }
            None => std::env::current_dir().map_err(HarnessError::CurrentDir),
        }
    }

    pub fn runner(&self) -> &dyn ProvisioningRunner {
        self.runner.as_ref()
    }

    pub fn store(&self) -> &dyn StageStore {
        self.store.as_ref()
    }

    /// Stage runner bound to this context.
    pub fn stages(&self) -> StageRunner<'_> {
        StageRunner::new(self)
    }
}

/// Join `dir` onto `base`, folding `.` and `..` so that `parent()` is the
/// directory above.
fn absolute(base: &Path, dir: &Path) -> PathBuf {
    let mut resolved = base.to_path_buf();
    for component in dir.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}
