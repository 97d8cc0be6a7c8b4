//! Error types for package delivery

use thiserror::Error;

/// Result type alias using `DeliveryError`
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors raised by a single delivery attempt
///
/// None of these abort a batch: the manager retries and finally reports a
/// permanent failure for the file.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// FTP protocol or connection failure
    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    /// Could not reach or authenticate with the remote server
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A remote operation was refused
    #[error("Remote operation on {path} failed: {message}")]
    Remote { path: String, message: String },

    /// Session was used after it was closed
    #[error("Session is closed")]
    Closed,

    /// Local file could not be digested
    #[error("Content hash failed: {0}")]
    Hash(#[from] courier_assets::AssetError),

    /// Blocking transport task panicked or was cancelled
    #[error("Transport task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    pub fn remote(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Remote {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
