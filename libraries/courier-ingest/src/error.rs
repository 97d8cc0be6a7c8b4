//! Error types for record loading

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook has no worksheets: {0}")]
    NoWorksheet(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed input: {0}")]
    Malformed(String),
}
