//! Per-test stage store.
//!
//! The store is created once per test and handed to every stage. It answers
//! "should this stage run?", keeps the run configuration between stages, and
//! owns the temporary working copies it creates.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use tfkit_runner::RunConfiguration;

use crate::copy::copy_module_tree;
use crate::error::{StageError, StageResult};
use crate::settings::StageSettings;
use crate::stage::StageName;

/// Persisted per-stage state for one test.
pub trait StageStore: Send + Sync {
    /// Whether the stage was explicitly skipped for this run.
    fn should_skip(&self, stage: StageName) -> bool;

    /// Whether the stage already completed in this run.
    fn is_complete(&self, stage: StageName) -> bool;

    /// Record that the stage completed.
    fn mark_complete(&self, stage: StageName);

    /// Persist the run configuration under `dir` for later stages.
    fn save_config(&self, dir: &Path, config: &RunConfiguration) -> StageResult<()>;

    /// Load the configuration saved by [`StageStore::save_config`].
    fn load_config(&self, dir: &Path) -> StageResult<RunConfiguration>;

    /// Copy `source` into a fresh temporary folder named after `name`.
    fn copy_working_tree_to_temp(&self, source: &Path, name: &str) -> StageResult<PathBuf>;

    /// Remove a working copy created by this store. Other paths are left alone.
    fn release_working_copy(&self, path: &Path) -> StageResult<()>;

    /// Remove the test-data folder under `dir`, if it exists.
    fn cleanup_data_folder(&self, dir: &Path) -> StageResult<()>;
}

/// Filesystem-backed stage store.
pub struct FsStageStore {
    settings: StageSettings,
    completed: RwLock<HashSet<StageName>>,
    working_copies: Mutex<Vec<PathBuf>>,
}

impl FsStageStore {
    pub fn new(settings: StageSettings) -> Self {
        Self {
            settings,
            completed: RwLock::new(HashSet::new()),
            working_copies: Mutex::new(Vec::new()),
        }
    }

    /// Store configured from `SKIP_<stage>` environment variables.
    pub fn from_env() -> Self {
        Self::new(StageSettings::from_env())
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// Test-data folder for a working directory.
    pub fn data_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.settings.data_dir_name)
    }

    fn options_path(&self, dir: &Path) -> PathBuf {
        self.data_dir(dir).join(&self.settings.options_file_name)
    }
}

impl Default for FsStageStore {
    fn default() -> Self {
        Self::new(StageSettings::default())
    }
}

impl StageStore for FsStageStore {
    fn should_skip(&self, stage: StageName) -> bool {
        self.settings.skipped.contains(&stage)
    }

    fn is_complete(&self, stage: StageName) -> bool {
        self.completed.read().contains(&stage)
    }

    fn mark_complete(&self, stage: StageName) {
        self.completed.write().insert(stage);
    }

    fn save_config(&self, dir: &Path, config: &RunConfiguration) -> StageResult<()> {
        let path = self.options_path(dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&path, content)?;
        debug!("Saved run configuration to {:?}", path);
        Ok(())
    }

    fn load_config(&self, dir: &Path) -> StageResult<RunConfiguration> {
        let path = self.options_path(dir);
        if !path.exists() {
            return Err(StageError::ConfigNotFound(path));
        }

        let content = fs::read_to_string(&path)?;
        debug!("Loaded run configuration from {:?}", path);
        Ok(serde_json::from_str(&content)?)
    }

    fn copy_working_tree_to_temp(&self, source: &Path, name: &str) -> StageResult<PathBuf> {
        if self.settings.is_resuming() {
            info!(
                "Stages are being skipped; using {:?} in place so saved state is reused",
                source
            );
            return Ok(source.to_path_buf());
        }

        let temp = tempfile::Builder::new()
            .prefix(&format!("{}-", temp_prefix(name)))
            .tempdir()?
            .keep();

        if let Err(e) = copy_module_tree(source, &temp) {
            let _ = fs::remove_dir_all(&temp);
            return Err(StageError::CopyFailed {
                source_dir: source.to_path_buf(),
                source: Box::new(e),
            });
        }

        info!("Copied {:?} to working copy {:?}", source, temp);
        self.working_copies.lock().push(temp.clone());
        Ok(temp)
    }

    fn release_working_copy(&self, path: &Path) -> StageResult<()> {
        let mut copies = self.working_copies.lock();
        let Some(index) = copies.iter().position(|p| p == path) else {
            debug!("{:?} is not a working copy owned by this store", path);
            return Ok(());
        };

        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        copies.remove(index);
        info!("Released working copy {:?}", path);
        Ok(())
    }

    fn cleanup_data_folder(&self, dir: &Path) -> StageResult<()> {
        let data_dir = self.data_dir(dir);
        if data_dir.exists() {
            fs::remove_dir_all(&data_dir)?;
            debug!("Removed test data folder {:?}", data_dir);
        }
        Ok(())
    }
}

/// Test names carry `::` and other characters unsuitable for a folder name.
fn temp_prefix(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "tfkit".to_string()
    } else {
        cleaned
    }
}
