//! A test directory given relative to the process current directory.
//!
//! Kept in its own test binary since it changes the current directory.

use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use tfkit::{default_options, TestContext};
use tfkit_runner::{MockRunner, RunConfiguration};
use tfkit_stage::{FsStageStore, StageSettings, StageStore};

#[test]
fn test_relative_test_dir_copies_module_root() {
    let root = tempdir().unwrap();
    let module = root.path().join("module");
    let test_dir = module.join("test");
    fs::create_dir_all(test_dir.join("variables")).unwrap();
    fs::write(module.join("main.tf"), "resource \"null_resource\" \"this\" {}\n").unwrap();
    fs::write(test_dir.join("variables/relative.tfvars"), "name = \"demo\"\n").unwrap();

    std::env::set_current_dir(&test_dir).unwrap();

    let ctx = TestContext::new("relative")
        .with_test_dir(".")
        .with_runner(Arc::new(MockRunner::new()))
        .with_store(Arc::new(FsStageStore::new(StageSettings::new())));

    let config = default_options(&ctx, RunConfiguration::new()).unwrap();

    assert_ne!(config.working_dir, module);
    assert!(config.working_dir.join("main.tf").exists());
    assert!(config.working_dir.join("test/variables/relative.tfvars").exists());
    assert_eq!(
        config.var_files,
        vec![std::path::PathBuf::from("test/variables/relative.tfvars")]
    );

    ctx.store().release_working_copy(&config.working_dir).unwrap();
}
