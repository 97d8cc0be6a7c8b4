/// Core error types for DDEX Courier
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for DDEX Courier
#[derive(Error, Debug)]
pub enum CoreError {
    /// A package or batch folder could not be created
    #[error("Failed to prepare folder {path}: {source}")]
    Folder {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
