use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("test {0} not found")]
    TestNotFound(String),

    #[error("invalid test catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
