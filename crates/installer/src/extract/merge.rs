//! Directory merge-copy
//!
//! Same-named directories are merged recursively and same-named files are
//! overwritten, so installing into a populated `addons/` keeps what other
//! assets put there.

use std::fs;
use std::path::Path;
use tracing::{trace, warn};

use crate::error::ExtractError;

/// Copy every entry inside `src` into `dest`. Returns the number of files written.
pub fn merge_dir_contents(src: &Path, dest: &Path) -> Result<u64, ExtractError> {
    fs::create_dir_all(dest).map_err(|e| ExtractError::io(dest, e))?;

    let mut copied = 0;
    for entry in fs::read_dir(src).map_err(|e| ExtractError::io(src, e))? {
        let entry = entry.map_err(|e| ExtractError::io(src, e))?;
        copied += copy_entry(&entry.path(), &dest.join(entry.file_name()))?;
    }
    Ok(copied)
}

/// Copy one file or directory tree to `dest`, merging into what is there.
/// Symlinks are skipped and never followed.
pub fn copy_entry(src: &Path, dest: &Path) -> Result<u64, ExtractError> {
    let metadata = fs::symlink_metadata(src).map_err(|e| ExtractError::io(src, e))?;

    if metadata.file_type().is_symlink() {
        warn!("Skipping symlink {}", src.display());
        Ok(0)
    } else if metadata.is_dir() {
        merge_dir_contents(src, dest)
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        trace!("Copying {} -> {}", src.display(), dest.display());
        fs::copy(src, dest).map_err(|e| ExtractError::io(dest, e))?;
        Ok(1)
    }
}
