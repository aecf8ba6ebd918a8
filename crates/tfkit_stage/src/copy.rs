//! Module tree copying.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::StageResult;

/// Hidden files that terraform needs in the copy.
const KEPT_HIDDEN_FILES: &[&str] = &[".terraform.lock.hcl", ".terraform-version"];

/// Copy a module tree into `dest`, returning the number of files copied.
///
/// Hidden files and folders (`.terraform`, `.git`, `.test-data`, ...) and
/// local state files are left behind, so the copy starts from a clean slate.
pub fn copy_module_tree(source: &Path, dest: &Path) -> StageResult<usize> {
    let mut copied = 0;

    let walker = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !(is_excluded(entry) || entry.path().starts_with(dest)));

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!("Copied {} files from {:?} to {:?}", copied, source, dest);
    Ok(copied)
}

fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();

    if name.starts_with('.') {
        return !(entry.file_type().is_file() && KEPT_HIDDEN_FILES.contains(&&*name));
    }

    entry.file_type().is_file() && (name.ends_with(".tfstate") || name.ends_with(".tfstate.backup"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_skips_hidden_and_state() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();

        fs::write(src.path().join("main.tf"), "resource {}").unwrap();
        fs::write(src.path().join("terraform.tfstate"), "{}").unwrap();
        fs::write(src.path().join("terraform.tfstate.backup"), "{}").unwrap();
        fs::write(src.path().join(".terraform.lock.hcl"), "lock").unwrap();
        fs::create_dir_all(src.path().join(".terraform/providers")).unwrap();
        fs::write(src.path().join(".terraform/providers/p"), "bin").unwrap();
        fs::create_dir_all(src.path().join("test/variables")).unwrap();
        fs::write(src.path().join("test/variables/a.tfvars"), "x = 1").unwrap();

        let copied = copy_module_tree(src.path(), dst.path()).unwrap();

        assert_eq!(copied, 3);
        assert!(dst.path().join("main.tf").exists());
        assert!(dst.path().join(".terraform.lock.hcl").exists());
        assert!(dst.path().join("test/variables/a.tfvars").exists());
        assert!(!dst.path().join("terraform.tfstate").exists());
        assert!(!dst.path().join("terraform.tfstate.backup").exists());
        assert!(!dst.path().join(".terraform").exists());
    }
}
