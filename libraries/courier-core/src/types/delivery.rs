/// Remote destinations and per-file delivery outcomes
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a package file lands on the remote server
///
/// The remote layout mirrors the local one: `/BATCH_<YYYYMMDD>/<UPC>/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationKey {
    /// Batch identifier (`YYYYMMDD`)
    pub batch_id: String,

    /// Package UPC (already sanitized for path use)
    pub upc: String,
}

impl DestinationKey {
    pub fn new(batch_id: impl Into<String>, upc: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            upc: upc.into(),
        }
    }

    /// Remote batch directory, e.g. `/BATCH_20250301`
    pub fn batch_dir(&self) -> String {
        format!("/BATCH_{}", self.batch_id)
    }

    /// Remote package directory, e.g. `/BATCH_20250301/00012345`
    pub fn package_dir(&self) -> String {
        format!("{}/{}", self.batch_dir(), self.upc)
    }

    /// Remote path of a file inside the package directory
    pub fn remote_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.package_dir(), file_name)
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.package_dir())
    }
}

/// Terminal state of one file's delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// File was transferred
    Delivered,

    /// A same-named file already exists at the destination
    SkippedDuplicate,

    /// Every attempt failed
    PermanentlyFailed { reason: String },
}

impl DeliveryOutcome {
    /// Whether the file is present at the destination after this outcome
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered | Self::SkippedDuplicate)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("delivered"),
            Self::SkippedDuplicate => f.write_str("skipped (duplicate)"),
            Self::PermanentlyFailed { reason } => write!(f, "failed permanently: {reason}"),
        }
    }
}
