//! # tfkit_stage
//!
//! Stage bookkeeping for tfkit tests.
//!
//! A test run is split into named stages (`setup`, `apply`, `validate`,
//! `destroy`). This crate decides whether each stage runs, persists the run
//! configuration between stages, and manages the temporary copy of the module
//! each test works in.
//!
//! Setting `SKIP_<stage>` (e.g. `SKIP_destroy=1`) skips that stage. While any
//! stage is skipped the module is used in place instead of being copied, so
//! state saved by an earlier run can be picked up again.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfkit_stage::{run_stage, FsStageStore, StageName, StageStore, StageError};
//! use tfkit_runner::RunConfiguration;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), StageError> {
//! let store = FsStageStore::from_env();
//! let dir = store.copy_working_tree_to_temp(Path::new(".."), "bucket_test")?;
//!
//! run_stage(&store, StageName::Setup, async {
//!     store.save_config(&dir, &RunConfiguration::new().working_dir(&dir))
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod copy;
pub mod error;
pub mod settings;
pub mod stage;
pub mod store;

pub use copy::copy_module_tree;
pub use error::{StageError, StageResult};
pub use settings::{StageSettings, DEFAULT_DATA_DIR, DEFAULT_OPTIONS_FILE};
pub use stage::{run_stage, StageName};
pub use store::{FsStageStore, StageStore};
