/// Asset categories handled by the pipeline
use serde::{Deserialize, Serialize};

/// Kind of file in a release package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Audio rendition (mp3, wav, flac)
    Audio,

    /// Cover artwork
    Image,

    /// Generated release notification document
    Document,
}

impl AssetKind {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" | "wav" | "flac" => Some(Self::Audio),
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            "xml" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Document => "document",
        }
    }
}
