//! Per-file delivery with bounded retry

use crate::error::{DeliveryError, Result};
use crate::transport::{ensure_dir, RemoteConnector, RemoteSession};
use courier_core::{DeliveryOutcome, DestinationKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retry and duplicate-handling policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// Attempts per file before giving up
    pub max_retries: u32,

    /// Fixed pause between attempts
    pub retry_delay: Duration,

    /// Compare content digests when a same-named remote file exists
    pub verify_content_hash: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            verify_content_hash: false,
        }
    }
}

/// Where a file is in its delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Connecting { attempt: u32 },
    Uploading { attempt: u32 },
    Retrying { attempt: u32 },
    Finished(DeliveryOutcome),
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            Self::Uploading { attempt } => write!(f, "uploading (attempt {attempt})"),
            Self::Retrying { attempt } => write!(f, "retrying after attempt {attempt}"),
            Self::Finished(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Result of delivering one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub file: PathBuf,
    pub destination: DestinationKey,
    pub outcome: DeliveryOutcome,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// One entry per failed attempt
    pub diagnostics: Vec<String>,
}

/// Delivers package files to a remote target
///
/// Every attempt opens a fresh session, makes sure the batch and package
/// directories exist, lists the package directory and uploads the file
/// unless a same-named entry is already there. Failed attempts are retried
/// after a fixed delay; after `max_retries` attempts the file is reported as
/// permanently failed and the caller moves on.
pub struct DeliveryManager {
    connector: Arc<dyn RemoteConnector>,
    settings: DeliverySettings,
}

impl DeliveryManager {
    pub fn new(connector: Arc<dyn RemoteConnector>, settings: DeliverySettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Deliver one file; never fails, the outcome is in the report
    pub async fn deliver(&self, file: &Path, destination: &DestinationKey) -> DeliveryReport {
        let mut report = DeliveryReport {
            file: file.to_path_buf(),
            destination: destination.clone(),
            outcome: DeliveryOutcome::Delivered,
            attempts: 0,
            diagnostics: Vec::new(),
        };
        trace_state(file, &DeliveryState::Pending);

        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            return finish(report, permanent("file has no usable name"));
        };
        if !file.is_file() {
            // retrying cannot make a local file appear
            return finish(report, permanent("local file does not exist"));
        }

        let max_retries = self.settings.max_retries.max(1);
        for attempt in 1..=max_retries {
            report.attempts = attempt;
            match self.attempt(file, name, destination, attempt).await {
                Ok(outcome) => return finish(report, outcome),
                Err(e) => {
                    warn!(
                        file = %file.display(),
                        destination = %destination,
                        attempt,
                        max_retries,
                        error = %e,
                        "Delivery attempt failed"
                    );
                    report.diagnostics.push(format!("attempt {attempt}: {e}"));
                }
            }

            if attempt < max_retries {
                trace_state(file, &DeliveryState::Retrying { attempt });
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        let reason = format!(
            "gave up after {} attempts: {}",
            report.attempts,
            report.diagnostics.last().map_or("unknown error", String::as_str)
        );
        finish(report, permanent(reason))
    }

    /// Deliver files one after another, in order
    pub async fn deliver_all(&self, files: &[(PathBuf, DestinationKey)]) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(files.len());
        for (file, destination) in files {
            reports.push(self.deliver(file, destination).await);
        }
        reports
    }

    async fn attempt(
        &self,
        file: &Path,
        name: &str,
        destination: &DestinationKey,
        attempt: u32,
    ) -> Result<DeliveryOutcome> {
        trace_state(file, &DeliveryState::Connecting { attempt });
        let mut session = self.connector.connect().await?;

        let result = self.transfer(session.as_mut(), file, name, destination, attempt).await;
        if let Err(e) = session.close().await {
            debug!(error = %e, "Session close failed");
        }
        result
    }

    async fn transfer(
        &self,
        session: &mut dyn RemoteSession,
        file: &Path,
        name: &str,
        destination: &DestinationKey,
        attempt: u32,
    ) -> Result<DeliveryOutcome> {
        ensure_dir(session, &destination.batch_dir()).await?;
        ensure_dir(session, &destination.package_dir()).await?;

        let existing = session.list_names().await?;
        if existing.iter().any(|entry| entry == name) {
            if !self.settings.verify_content_hash {
                return Ok(DeliveryOutcome::SkippedDuplicate);
            }
            if self.same_content(session, file, name).await? {
                return Ok(DeliveryOutcome::SkippedDuplicate);
            }
            info!(file = %name, destination = %destination, "Remote copy differs, replacing");
        }

        trace_state(file, &DeliveryState::Uploading { attempt });
        session.upload(file, name).await?;
        Ok(DeliveryOutcome::Delivered)
    }

    async fn same_content(
        &self,
        session: &mut dyn RemoteSession,
        file: &Path,
        name: &str,
    ) -> Result<bool> {
        let remote = session.download(name).await?;
        let local_path = file.to_path_buf();
        let local = tokio::task::spawn_blocking(move || courier_assets::file_digest(&local_path))
            .await?
            .map_err(DeliveryError::from)?;
        Ok(local == courier_assets::bytes_digest(&remote))
    }
}

fn permanent(reason: impl Into<String>) -> DeliveryOutcome {
    DeliveryOutcome::PermanentlyFailed {
        reason: reason.into(),
    }
}

fn finish(mut report: DeliveryReport, outcome: DeliveryOutcome) -> DeliveryReport {
    match &outcome {
        DeliveryOutcome::Delivered => info!(
            file = %report.file.display(),
            destination = %report.destination,
            attempts = report.attempts,
            "Uploaded"
        ),
        DeliveryOutcome::SkippedDuplicate => info!(
            file = %report.file.display(),
            destination = %report.destination,
            "Already on server, skipped"
        ),
        DeliveryOutcome::PermanentlyFailed { reason } => error!(
            file = %report.file.display(),
            destination = %report.destination,
            attempts = report.attempts,
            reason = %reason,
            "Permanent failure"
        ),
    }
    trace_state(&report.file, &DeliveryState::Finished(outcome.clone()));
    report.outcome = outcome;
    report
}

fn trace_state(file: &Path, state: &DeliveryState) {
    debug!(file = %file.display(), state = %state, "Delivery state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalSession;
    use crate::transport::MockRemoteConnector;
    use tempfile::TempDir;

    fn settings() -> DeliverySettings {
        DeliverySettings::default()
    }

    fn package_file(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("00012345_Test_Song_20250301.xml");
        std::fs::write(&path, b"<NewReleaseMessage/>").unwrap();
        path
    }

    fn destination() -> DestinationKey {
        DestinationKey::new("20250301", "00012345")
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let temp = TempDir::new().unwrap();
        let file = package_file(&temp);

        let mut connector = MockRemoteConnector::new();
        connector
            .expect_connect()
            .times(3)
            .returning(|| Err(DeliveryError::Connect("connection refused".into())));

        let manager = DeliveryManager::new(Arc::new(connector), settings());
        let started = tokio::time::Instant::now();
        let report = manager.deliver(&file, &destination()).await;

        assert_eq!(report.attempts, 3);
        assert_eq!(report.diagnostics.len(), 3);
        assert!(matches!(
            report.outcome,
            DeliveryOutcome::PermanentlyFailed { ref reason } if reason.contains("connection refused")
        ));
        // two pauses between three attempts
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_later_attempt() {
        let temp = TempDir::new().unwrap();
        let file = package_file(&temp);
        let remote = TempDir::new().unwrap();
        let remote_root = remote.path().to_path_buf();

        let mut connector = MockRemoteConnector::new();
        let mut calls = 0;
        connector.expect_connect().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(DeliveryError::Connect("timed out".into()))
            } else {
                Ok(Box::new(LocalSession::new(remote_root.clone())) as Box<dyn RemoteSession>)
            }
        });

        let manager = DeliveryManager::new(Arc::new(connector), settings());
        let report = manager.deliver(&file, &destination()).await;

        assert_eq!(report.outcome, DeliveryOutcome::Delivered);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.diagnostics, vec!["attempt 1: Connection failed: timed out"]);
        assert!(remote
            .path()
            .join("BATCH_20250301/00012345/00012345_Test_Song_20250301.xml")
            .is_file());
    }

    #[tokio::test]
    async fn test_missing_local_file_fails_without_connecting() {
        let temp = TempDir::new().unwrap();
        let mut connector = MockRemoteConnector::new();
        connector.expect_connect().never();

        let manager = DeliveryManager::new(Arc::new(connector), settings());
        let report = manager
            .deliver(&temp.path().join("absent.mp3"), &destination())
            .await;

        assert_eq!(report.attempts, 0);
        assert!(!report.outcome.is_success());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            DeliveryState::Connecting { attempt: 2 }.to_string(),
            "connecting (attempt 2)"
        );
        assert_eq!(
            DeliveryState::Finished(DeliveryOutcome::SkippedDuplicate).to_string(),
            "skipped (duplicate)"
        );
    }
}
