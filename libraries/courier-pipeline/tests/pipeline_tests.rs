//! End-to-end tests for batch runs
//!
//! Each test lays out a source tree (spreadsheet export, media folders) in a
//! temp directory, runs the pipeline against the local delivery target and a
//! local schema file, and inspects the package tree, the status log and the
//! delivered files.

use chrono::NaiveDate;
use courier_core::DeliveryOutcome;
use courier_pipeline::{CourierConfig, DeliveryTarget, Pipeline, PipelinePhase, RunLog};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::mpsc;

const TEST_SONG: &str = r#"[
  {
    "Primary Artists": "Nairobi Choir",
    "Label": "Acme",
    "ISRC Code": "US123",
    "UPC Code": "00012345",
    "Track Titles": "Test Song",
    "Duration": "3:45"
  }
]"#;

const DOCUMENT_NAME: &str = "00012345_Test_Song_20250301.xml";

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new(records: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        for folder in ["AUDIO", "WAV", "IMAGES"] {
            std::fs::create_dir_all(source.join(folder)).unwrap();
        }
        std::fs::write(source.join("records.json"), records).unwrap();
        Self { temp }
    }

    fn source(&self) -> PathBuf {
        self.temp.path().join("source")
    }

    fn remote(&self) -> PathBuf {
        self.temp.path().join("remote")
    }

    fn package_dir(&self) -> PathBuf {
        self.temp
            .path()
            .join("DDEX")
            .join("Choir")
            .join("BATCH_20250301")
            .join("00012345")
    }

    fn remote_package_dir(&self) -> PathBuf {
        self.remote().join("BATCH_20250301").join("00012345")
    }

    fn status_log(&self) -> RunLog {
        RunLog::new(
            self.temp
                .path()
                .join("DDEX")
                .join("Choir")
                .join("upload_log_20250301.txt"),
        )
    }

    fn config(&self) -> CourierConfig {
        let mut config = CourierConfig::default();
        config.paths.local_dir = self.source();
        config.paths.output_dir = self.temp.path().join("DDEX");
        config.paths.input_file = Some(self.source().join("records.json"));
        config.schema.location = fixture_schema().display().to_string();
        config.delivery.target = DeliveryTarget::Local;
        config.delivery.local_root = Some(self.remote());
        config.delivery.require_confirmation = false;
        config.delivery.retry_delay_secs = 0;
        config
    }

    fn pipeline(&self, config: CourierConfig) -> Pipeline {
        Pipeline::new(config)
            .expect("Failed to build pipeline")
            .with_run_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn add_media(&self) {
        std::fs::write(self.source().join("AUDIO").join("test_song.mp3"), b"ID3 audio").unwrap();
        image::RgbImage::new(800, 800)
            .save(self.source().join("IMAGES").join("test_song.jpg"))
            .unwrap();
    }
}

fn fixture_schema() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/release-notification-subset.xsd")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Full runs
// ============================================================================

#[tokio::test]
async fn test_track_without_media() {
    let workspace = Workspace::new(TEST_SONG);
    let pipeline = workspace.pipeline(workspace.config());

    let report = pipeline
        .process_and_upload("Choir", |_| panic!("approval not required"))
        .await;

    assert!(report.success, "error: {:?}", report.error);
    assert_eq!(report.processed_tracks.len(), 1);
    assert_eq!(report.processed_tracks[0].upc, "00012345");
    assert_eq!(report.processed_tracks[0].title, "Test Song");
    assert!(report.processed_tracks[0].document_valid);

    // no media copied, only the document
    assert_eq!(file_names(&workspace.package_dir()), vec![DOCUMENT_NAME]);
    let xml = std::fs::read_to_string(workspace.package_dir().join(DOCUMENT_NAME)).unwrap();
    assert!(xml.contains("<Duration>PT3M45S</Duration>"));

    assert_eq!(
        workspace.status_log().lines().unwrap(),
        vec!["Missing file: Test Song.mp3", "Missing file: Test Song.jpg"]
    );

    // valid document was queued and delivered
    assert_eq!(report.deliveries.len(), 1);
    assert_eq!(report.deliveries[0].outcome, DeliveryOutcome::Delivered);
    assert!(workspace.remote_package_dir().join(DOCUMENT_NAME).is_file());
}

#[tokio::test]
async fn test_track_with_media_is_delivered_complete() {
    let workspace = Workspace::new(TEST_SONG);
    workspace.add_media();
    let pipeline = workspace.pipeline(workspace.config());

    let report = pipeline.process_and_upload("Choir", |_| true).await;

    assert!(report.success);
    assert_eq!(report.delivered_count(), 3);
    assert!(workspace.status_log().lines().unwrap().is_empty());
    assert_eq!(
        file_names(&workspace.remote_package_dir()),
        vec![DOCUMENT_NAME, "test_song.jpg", "test_song.mp3"]
    );

    // originals stay in place
    assert!(workspace.source().join("AUDIO/test_song.mp3").is_file());

    let xml = std::fs::read_to_string(workspace.package_dir().join(DOCUMENT_NAME)).unwrap();
    assert!(xml.contains("<FileName>test_song.jpg</FileName>"));
}

#[tokio::test]
async fn test_undersized_cover_is_not_delivered() {
    let workspace = Workspace::new(TEST_SONG);
    std::fs::write(workspace.source().join("AUDIO/test_song.mp3"), b"ID3 audio").unwrap();
    image::RgbImage::new(799, 900)
        .save(workspace.source().join("IMAGES/test_song.jpg"))
        .unwrap();

    let report = workspace
        .pipeline(workspace.config())
        .process_and_upload("Choir", |_| true)
        .await;

    assert!(report.success);
    assert_eq!(
        file_names(&workspace.remote_package_dir()),
        vec![DOCUMENT_NAME, "test_song.mp3"]
    );
    assert_eq!(
        workspace.status_log().lines().unwrap(),
        vec!["Missing file: Test Song.jpg"]
    );
}

#[tokio::test]
async fn test_second_run_skips_delivered_files() {
    let workspace = Workspace::new(TEST_SONG);
    workspace.add_media();
    let pipeline = workspace.pipeline(workspace.config());

    let first = pipeline.process_and_upload("Choir", |_| true).await;
    let second = pipeline.process_and_upload("Choir", |_| true).await;

    assert_eq!(first.delivered_count(), 3);
    assert_eq!(second.delivered_count(), 0);
    assert_eq!(second.skipped_count(), 3);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_failed_cover_copy_keeps_audio_queued() {
    let workspace = Workspace::new(TEST_SONG);
    workspace.add_media();
    // a directory where the cover copy should land
    std::fs::create_dir_all(workspace.package_dir().join("test_song.jpg")).unwrap();
    let pipeline = workspace.pipeline(workspace.config());

    let prepared = pipeline.prepare("Choir").await.unwrap();

    let queued: Vec<String> = prepared
        .queue
        .iter()
        .map(|q| q.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(queued, vec!["test_song.mp3", DOCUMENT_NAME]);

    let record = &prepared.records[0];
    assert_eq!(record.failed.len(), 1);
    assert_eq!(record.missing.len(), 1);
    assert_eq!(record.missing[0].extension, "jpg");

    let lines = workspace.status_log().lines().unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Copy failed: "));
    assert!(lines[0].contains("test_song.jpg"));
    assert_eq!(lines[1], "Missing file: Test Song.jpg");

    let xml = std::fs::read_to_string(workspace.package_dir().join(DOCUMENT_NAME)).unwrap();
    assert!(!xml.contains("<FileName>test_song.jpg</FileName>"));
}

#[tokio::test]
async fn test_unwritable_status_log_does_not_stop_batch() {
    let records = r#"[
      {"Track Titles": "Test Song", "ISRC Code": "US123", "UPC Code": "00012345", "Duration": "3:45"},
      {"Track Titles": "Second Song", "ISRC Code": "US456", "UPC Code": "67890", "Duration": "2:10"}
    ]"#;
    let workspace = Workspace::new(records);
    // a directory at the log path makes every append fail
    std::fs::create_dir_all(workspace.status_log().path()).unwrap();

    let report = workspace
        .pipeline(workspace.config())
        .process_and_upload("Choir", |_| true)
        .await;

    assert!(report.success, "error: {:?}", report.error);
    assert_eq!(report.processed_tracks.len(), 2);
    assert_eq!(report.delivered_count(), 2);
    assert!(workspace.remote_package_dir().join(DOCUMENT_NAME).is_file());
    assert!(workspace
        .remote()
        .join("BATCH_20250301/67890/67890_Second_Song_20250301.xml")
        .is_file());
}

// ============================================================================
// Validation and approval
// ============================================================================

#[tokio::test]
async fn test_invalid_document_is_logged_and_not_delivered() {
    let workspace = Workspace::new(TEST_SONG);
    let schema = workspace.temp.path().join("other.xsd");
    std::fs::write(
        &schema,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="http://ddex.net/xml/ern/383">
  <xs:element name="PurgeReleaseMessage" type="xs:anyType"/>
</xs:schema>"#,
    )
    .unwrap();

    let mut config = workspace.config();
    config.schema.location = schema.display().to_string();
    let report = workspace
        .pipeline(config)
        .process_and_upload("Choir", |_| true)
        .await;

    assert!(report.success);
    assert!(!report.processed_tracks[0].document_valid);
    assert!(report.deliveries.is_empty());
    assert!(workspace
        .status_log()
        .lines()
        .unwrap()
        .contains(&format!("Invalid XML: {DOCUMENT_NAME}")));
    assert!(!workspace.remote_package_dir().exists());
}

#[tokio::test]
async fn test_declined_approval_delivers_nothing() {
    let workspace = Workspace::new(TEST_SONG);
    let mut config = workspace.config();
    config.delivery.require_confirmation = true;

    let mut queued = 0;
    let report = workspace
        .pipeline(config)
        .process_and_upload("Choir", |prepared| {
            queued = prepared.queue.len();
            false
        })
        .await;

    assert!(report.success);
    assert!(!report.approved);
    assert_eq!(queued, 1);
    assert!(report.deliveries.is_empty());
    assert!(!workspace.remote_package_dir().exists());
    // preparation still happened
    assert!(workspace.package_dir().join(DOCUMENT_NAME).is_file());
}

#[tokio::test]
async fn test_prepare_and_deliver_separately() {
    let workspace = Workspace::new(TEST_SONG);
    let pipeline = workspace.pipeline(workspace.config());

    let prepared = pipeline.prepare("Choir").await.unwrap();
    assert_eq!(prepared.records.len(), 1);
    assert_eq!(prepared.queue.len(), 1);
    assert!(!workspace.remote_package_dir().exists());

    let reports = pipeline.deliver(&prepared).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert!(workspace.remote_package_dir().join(DOCUMENT_NAME).is_file());
}

// ============================================================================
// Failures and progress
// ============================================================================

#[tokio::test]
async fn test_missing_input_reports_run_failed() {
    let workspace = Workspace::new(TEST_SONG);
    let mut config = workspace.config();
    config.paths.input_file = Some(workspace.source().join("absent.json"));

    let report = workspace
        .pipeline(config)
        .process_and_upload("Choir", |_| true)
        .await;

    assert!(!report.success);
    assert!(report.error.is_some());
    assert!(report.processed_tracks.is_empty());
    let lines = workspace.status_log().lines().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("RUN FAILED: "));
}

#[tokio::test]
async fn test_records_processed_in_input_order() {
    let records = r#"[
      {"Track Titles": "Test Song", "ISRC Code": "US123", "UPC Code": "00012345", "Duration": "3:45"},
      {},
      {"Track Titles": "Second Song", "ISRC Code": "US456", "UPC Code": 67890, "Duration": "2:10"}
    ]"#;
    let workspace = Workspace::new(records);

    let report = workspace
        .pipeline(workspace.config())
        .process_and_upload("Choir", |_| true)
        .await;

    assert!(report.success);
    let tracks: Vec<(&str, &str)> = report
        .processed_tracks
        .iter()
        .map(|t| (t.upc.as_str(), t.title.as_str()))
        .collect();
    assert_eq!(
        tracks,
        vec![("00012345", "Test Song"), ("67890", "Second Song")]
    );
    assert!(workspace
        .remote()
        .join("BATCH_20250301/67890/67890_Second_Song_20250301.xml")
        .is_file());
}

#[tokio::test]
async fn test_progress_ends_with_finished() {
    let workspace = Workspace::new(TEST_SONG);
    let (tx, mut rx) = mpsc::channel(256);
    let pipeline = workspace.pipeline(workspace.config()).with_progress(tx);

    let report = pipeline.process_and_upload("Choir", |_| true).await;
    drop(pipeline);
    assert!(report.success);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.first().unwrap().phase, PipelinePhase::Loading);
    assert!(events.iter().any(|e| e.phase == PipelinePhase::Delivering));
    let last = events.last().unwrap();
    assert_eq!(last.phase, PipelinePhase::Finished);
    assert_eq!(last.processed_records, 1);
    assert_eq!(last.delivered_files, 1);
}
