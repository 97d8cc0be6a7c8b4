//! Append-only run status log
//!
//! One line per problem an operator has to act on. The file sits next to the
//! batch folders as `upload_log_<YYYYMMDD>.txt` and is shared by every run of
//! the same day.

use courier_assets::{FailedAsset, MissingAsset};
use courier_core::BatchContext;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The status log of a batch
    pub fn for_batch(batch: &BatchContext) -> Self {
        Self::new(batch.status_log_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Missing file: <title>.<ext>`
    pub fn missing(&self, asset: &MissingAsset) -> io::Result<()> {
        self.append(&asset.to_string())
    }

    /// `Copy failed: <source> (<reason>)`
    pub fn copy_failed(&self, asset: &FailedAsset) -> io::Result<()> {
        self.append(&asset.to_string())
    }

    /// `Invalid XML: <file name>`
    pub fn invalid_document(&self, document: &Path) -> io::Result<()> {
        let name = document
            .file_name()
            .map_or_else(|| document.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.append(&format!("Invalid XML: {name}"))
    }

    /// `Permanent failure: <path> (<reason>)`
    pub fn permanent_failure(&self, file: &Path, reason: &str) -> io::Result<()> {
        self.append(&format!("Permanent failure: {} ({reason})", file.display()))
    }

    /// `RUN FAILED: <error>`
    pub fn run_failed(&self, error: &dyn Display) -> io::Result<()> {
        self.append(&format!("RUN FAILED: {error}"))
    }

    /// Every line written so far; empty if the log does not exist yet
    pub fn lines(&self) -> io::Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}
