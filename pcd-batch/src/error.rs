use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input directory not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("no *{suffix} files found in {}", .dir.display())]
    NoInputs { dir: PathBuf, suffix: String },

    #[error("aborted by user")]
    Declined,

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
