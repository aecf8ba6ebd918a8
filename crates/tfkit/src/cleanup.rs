//! Best-effort removal of per-test artifacts.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::context::TestContext;
use crate::stages::COPIED_PROVIDER_FILE;

/// Remove the test data folder and the copied provider configuration from
/// `working_dir`.
///
/// Missing files are fine, so calling this twice is harmless. Removal errors
/// are logged and otherwise ignored.
pub fn cleanup(ctx: &TestContext, working_dir: &Path) {
    if let Err(e) = ctx.store().cleanup_data_folder(working_dir) {
        warn!("Could not remove test data folder in {:?}: {}", working_dir, e);
    }

    let provider_path = working_dir.join(COPIED_PROVIDER_FILE);
    if provider_path.exists() {
        match fs::remove_file(&provider_path) {
            Ok(()) => debug!("Removed {:?}", provider_path),
            Err(e) => warn!("Could not remove {:?}: {}", provider_path, e),
        }
    }
}
