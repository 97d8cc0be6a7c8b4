/// Run-date scoped filesystem layout
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

use super::delivery::DestinationKey;
use super::record::MetadataRecord;
use crate::error::{CoreError, Result};
use crate::naming::{sanitize_component, underscored};

/// Layout of one batch run
///
/// Built once at pipeline start and passed to every stage, so the run date
/// cannot drift between the folder name, the document name and the remote path.
///
/// ```text
/// <local_root>/
/// ├── upload_log_<YYYYMMDD>.txt
/// └── BATCH_<YYYYMMDD>/
///     └── <UPC>/
///         ├── <UPC>_<Title>_<YYYYMMDD>.xml
///         └── <media files>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    local_root: PathBuf,
    date: NaiveDate,
}

impl BatchContext {
    pub fn new(local_root: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            local_root: local_root.into(),
            date,
        }
    }

    /// Batch dated with the local calendar day
    pub fn today(local_root: impl Into<PathBuf>) -> Self {
        Self::new(local_root, Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// `YYYYMMDD`
    pub fn batch_id(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// `<local_root>/BATCH_<YYYYMMDD>`
    pub fn batch_root(&self) -> PathBuf {
        self.local_root.join(format!("BATCH_{}", self.batch_id()))
    }

    /// `<batch_root>/<UPC>`
    pub fn package_dir(&self, upc: &str) -> PathBuf {
        self.batch_root().join(sanitize_component(upc))
    }

    /// Create the package folder if needed and return it
    ///
    /// Safe to call repeatedly for the same UPC.
    pub fn ensure_package_dir(&self, upc: &str) -> Result<PathBuf> {
        let dir = self.package_dir(upc);
        std::fs::create_dir_all(&dir).map_err(|source| CoreError::Folder {
            path: dir.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %dir.display(), "Package folder ready");
        Ok(dir)
    }

    /// Append-only status log for this run
    pub fn status_log_path(&self) -> PathBuf {
        self.local_root
            .join(format!("upload_log_{}.txt", self.batch_id()))
    }

    /// Remote destination for a package
    pub fn destination(&self, upc: &str) -> DestinationKey {
        DestinationKey::new(self.batch_id(), sanitize_component(upc))
    }

    /// `<UPC>_<Title_with_underscores>_<YYYYMMDD>.xml`
    pub fn document_file_name(&self, record: &MetadataRecord) -> String {
        format!(
            "{}_{}_{}.xml",
            sanitize_component(&record.upc),
            underscored(&record.title),
            self.batch_id()
        )
    }

    /// Full path of the generated document for a record
    pub fn document_path(&self, record: &MetadataRecord) -> PathBuf {
        self.package_dir(&record.upc)
            .join(self.document_file_name(record))
    }
}
