use std::path::PathBuf;

use thiserror::Error;

use pcd_core::ToolError;
use pcd_transformer::PipelineError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error(transparent)]
    ToolNotFound(#[from] ToolError),

    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{} failed{}: {stderr}", .program.display(), exit_code(.status))]
    ProcessFailed {
        program: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{} did not produce {}", .program.display(), .output.display())]
    MissingOutput { program: PathBuf, output: PathBuf },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("invalid Potree metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code(status: &Option<i32>) -> String {
    status
        .map(|code| format!(" with status {code}"))
        .unwrap_or_default()
}
