//! Error types for pipeline runs

use thiserror::Error;

/// Result type alias using `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop a run
///
/// Per-record and per-file problems never surface here; they are written to
/// the status log and the run continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration sources could not be read or merged
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration was read but is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load records: {0}")]
    Ingest(#[from] courier_ingest::IngestError),

    #[error("Schema validator unavailable: {0}")]
    Schema(#[from] courier_ern::SchemaError),

    #[error(transparent)]
    Core(#[from] courier_core::CoreError),

    /// Blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
