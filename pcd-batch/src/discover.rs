use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::BatchError;

pub const COPC_SUFFIX: &str = ".copc.laz";

/// Files in `dir` (not recursive) whose name ends with `suffix`, sorted by path.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::InputNotFound(dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/*{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(suffix)
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(BatchError::NoInputs {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        });
    }
    Ok(files)
}
