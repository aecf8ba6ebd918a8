//! Stage store settings.

use std::collections::HashSet;

use crate::stage::StageName;

/// Folder (inside a working directory) holding persisted test state.
pub const DEFAULT_DATA_DIR: &str = ".test-data";

/// File name of the persisted run configuration.
pub const DEFAULT_OPTIONS_FILE: &str = "TerraformOptions.json";

/// Settings for a [`FsStageStore`](crate::FsStageStore).
#[derive(Debug, Clone)]
pub struct StageSettings {
    /// Stages that must not run
    pub skipped: HashSet<StageName>,
    /// Name of the test-data folder
    pub data_dir_name: String,
    /// Name of the persisted configuration file
    pub options_file_name: String,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            skipped: HashSet::new(),
            data_dir_name: DEFAULT_DATA_DIR.to_string(),
            options_file_name: DEFAULT_OPTIONS_FILE.to_string(),
        }
    }
}

impl StageSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with skipped stages taken from `SKIP_<stage>` variables.
    ///
    /// A stage is skipped when its variable is set to a non-empty value.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        for stage in StageName::all() {
            if lookup(&stage.skip_env_var()).is_some_and(|value| !value.is_empty()) {
                settings.skipped.insert(stage);
            }
        }
        settings
    }

    pub fn skip(mut self, stage: StageName) -> Self {
        self.skipped.insert(stage);
        self
    }

    pub fn data_dir_name(mut self, name: impl Into<String>) -> Self {
        self.data_dir_name = name.into();
        self
    }

    /// Whether any stage is skipped, i.e. the run is resuming earlier state.
    pub fn is_resuming(&self) -> bool {
        !self.skipped.is_empty()
    }
}
