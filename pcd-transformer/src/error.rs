use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("pipeline JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{} exited with {}: {stderr}", .program.display(), exit_code(.status))]
    ProcessFailed {
        program: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    #[error("pipeline finished but output {} is missing or empty", .0.display())]
    MissingOutput(PathBuf),
}

fn exit_code(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
