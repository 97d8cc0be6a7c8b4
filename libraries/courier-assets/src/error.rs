//! Error types for asset resolution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssetError>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Package folder error: {0}")]
    Package(#[from] courier_core::CoreError),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}
