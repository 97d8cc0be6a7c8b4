//! Integration tests for package delivery
//!
//! Tests delivery behavior against the local directory transport:
//! - Remote layout creation
//! - Duplicate detection by file name
//! - Optional content digest comparison
//! - Batch ordering and permanent failures

use courier_core::{DeliveryOutcome, DestinationKey};
use courier_delivery::{
    DeliveryManager, DeliverySettings, FtpConnector, FtpSettings, LocalDirConnector,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    source: TempDir,
    remote: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            source: TempDir::new().unwrap(),
            remote: TempDir::new().unwrap(),
        }
    }

    fn file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.source.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn manager(&self, verify_content_hash: bool) -> DeliveryManager {
        DeliveryManager::new(
            Arc::new(LocalDirConnector::new(self.remote.path())),
            DeliverySettings {
                max_retries: 3,
                retry_delay: Duration::ZERO,
                verify_content_hash,
            },
        )
    }

    fn remote_file(&self, name: &str) -> PathBuf {
        self.remote
            .path()
            .join("BATCH_20250301")
            .join("00012345")
            .join(name)
    }
}

fn destination() -> DestinationKey {
    DestinationKey::new("20250301", "00012345")
}

// ============================================================================
// Duplicate detection
// ============================================================================

#[tokio::test]
async fn test_same_file_twice_is_delivered_then_skipped() {
    let fixture = Fixture::new();
    let file = fixture.file("test_song.mp3", b"ID3 audio");
    let manager = fixture.manager(false);

    let first = manager.deliver(&file, &destination()).await;
    let second = manager.deliver(&file, &destination()).await;

    assert_eq!(first.outcome, DeliveryOutcome::Delivered);
    assert_eq!(first.attempts, 1);
    assert_eq!(second.outcome, DeliveryOutcome::SkippedDuplicate);
    assert_eq!(
        std::fs::read(fixture.remote_file("test_song.mp3")).unwrap(),
        b"ID3 audio"
    );
}

#[tokio::test]
async fn test_name_match_skips_without_digest_check() {
    let fixture = Fixture::new();
    let file = fixture.file("cover.jpg", b"new cover");
    std::fs::create_dir_all(fixture.remote_file("")).unwrap();
    std::fs::write(fixture.remote_file("cover.jpg"), b"old cover").unwrap();

    let report = fixture.manager(false).deliver(&file, &destination()).await;

    assert_eq!(report.outcome, DeliveryOutcome::SkippedDuplicate);
    assert_eq!(
        std::fs::read(fixture.remote_file("cover.jpg")).unwrap(),
        b"old cover"
    );
}

#[tokio::test]
async fn test_digest_check_replaces_changed_file() {
    let fixture = Fixture::new();
    let file = fixture.file("cover.jpg", b"new cover");
    std::fs::create_dir_all(fixture.remote_file("")).unwrap();
    std::fs::write(fixture.remote_file("cover.jpg"), b"old cover").unwrap();

    let report = fixture.manager(true).deliver(&file, &destination()).await;

    assert_eq!(report.outcome, DeliveryOutcome::Delivered);
    assert_eq!(
        std::fs::read(fixture.remote_file("cover.jpg")).unwrap(),
        b"new cover"
    );
}

#[tokio::test]
async fn test_digest_check_skips_identical_file() {
    let fixture = Fixture::new();
    let file = fixture.file("cover.jpg", b"same cover");
    let manager = fixture.manager(true);

    assert_eq!(
        manager.deliver(&file, &destination()).await.outcome,
        DeliveryOutcome::Delivered
    );
    assert_eq!(
        manager.deliver(&file, &destination()).await.outcome,
        DeliveryOutcome::SkippedDuplicate
    );
}

// ============================================================================
// Batches
// ============================================================================

#[tokio::test]
async fn test_deliver_all_keeps_order_and_continues_past_failures() {
    let fixture = Fixture::new();
    let audio = fixture.file("test_song.mp3", b"audio");
    let missing = fixture.source.path().join("test_song.jpg");
    let document = fixture.file("00012345_Test_Song_20250301.xml", b"<xml/>");

    let files = vec![
        (audio.clone(), destination()),
        (missing.clone(), destination()),
        (document.clone(), destination()),
    ];
    let reports = fixture.manager(false).deliver_all(&files).await;

    let outcomes: Vec<bool> = reports.iter().map(|r| r.outcome.is_success()).collect();
    assert_eq!(outcomes, vec![true, false, true]);
    assert_eq!(reports[1].file, missing);
    assert!(fixture
        .remote_file("00012345_Test_Song_20250301.xml")
        .is_file());
}

#[tokio::test]
async fn test_packages_land_in_their_own_folders() {
    let fixture = Fixture::new();
    let first = fixture.file("a.mp3", b"a");
    let second = fixture.file("b.mp3", b"b");
    let manager = fixture.manager(false);

    manager
        .deliver(&first, &DestinationKey::new("20250301", "111"))
        .await;
    manager
        .deliver(&second, &DestinationKey::new("20250301", "222"))
        .await;

    let batch = fixture.remote.path().join("BATCH_20250301");
    assert!(batch.join("111/a.mp3").is_file());
    assert!(batch.join("222/b.mp3").is_file());
    assert!(!batch.join("111/b.mp3").exists());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_remote_directory_fails_permanently() {
    let fixture = Fixture::new();
    let file = fixture.file("test_song.mp3", b"audio");
    let manager = DeliveryManager::new(
        Arc::new(LocalDirConnector::new(fixture.remote.path().join("offline"))),
        DeliverySettings {
            max_retries: 2,
            retry_delay: Duration::ZERO,
            verify_content_hash: false,
        },
    );

    let report = manager.deliver(&file, &destination()).await;

    assert_eq!(report.attempts, 2);
    assert_eq!(report.diagnostics.len(), 2);
    assert!(matches!(
        report.outcome,
        DeliveryOutcome::PermanentlyFailed { .. }
    ));
}

#[tokio::test]
async fn test_refused_ftp_connection_fails_permanently() {
    let fixture = Fixture::new();
    let file = fixture.file("test_song.mp3", b"audio");
    let mut settings = FtpSettings::new("127.0.0.1", "user", "secret");
    settings.port = 1;
    settings.timeout = Duration::from_secs(2);

    let manager = DeliveryManager::new(
        Arc::new(FtpConnector::new(settings)),
        DeliverySettings {
            retry_delay: Duration::ZERO,
            ..DeliverySettings::default()
        },
    );
    let report = manager.deliver(&file, &destination()).await;

    assert_eq!(report.attempts, 3);
    assert!(!report.outcome.is_success());
}
