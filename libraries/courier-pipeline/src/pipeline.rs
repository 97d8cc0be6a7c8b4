//! Batch orchestration: records in, delivered packages out

use crate::config::{CourierConfig, DeliveryTarget};
use crate::error::{PipelineError, Result};
use crate::progress::{PipelinePhase, PipelineProgress, ProgressSink};
use crate::run_log::RunLog;
use chrono::{Local, NaiveDate, Utc};
use courier_assets::{
    standard_slots, AssetBundle, AssetResolver, FailedAsset, MissingAsset, RejectedAsset,
};
use courier_core::{AssetKind, BatchContext, DeliveryOutcome, DestinationKey, MetadataRecord};
use courier_delivery::{
    DeliveryManager, DeliveryReport, FtpConnector, LocalDirConnector, RemoteConnector,
};
use courier_ern::{DocumentBuilder, SchemaValidator, ValidationReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A file waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedFile {
    pub path: PathBuf,
    pub destination: DestinationKey,
    pub kind: AssetKind,
}

/// What preparation produced for one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedRecord {
    pub record: MetadataRecord,
    pub document: Option<PathBuf>,
    pub validation: Option<ValidationReport>,
    pub missing: Vec<MissingAsset>,
    pub rejected: Vec<RejectedAsset>,
    pub failed: Vec<FailedAsset>,
    /// Why the record produced no document
    pub error: Option<String>,
}

impl PreparedRecord {
    fn new(record: &MetadataRecord) -> Self {
        Self {
            record: record.clone(),
            document: None,
            validation: None,
            missing: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
            error: None,
        }
    }

    pub fn document_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.valid)
    }
}

/// Output of the preparation phase, input of delivery
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub batch: BatchContext,
    pub records: Vec<PreparedRecord>,
    pub queue: Vec<QueuedFile>,
}

impl PreparedBatch {
    pub fn status_log(&self) -> RunLog {
        RunLog::for_batch(&self.batch)
    }
}

/// One track that got as far as a built document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTrack {
    pub upc: String,
    pub title: String,
    pub document_valid: bool,
}

/// Summary handed back to the caller of a full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,

    /// The run completed; per-record and per-file problems are in the log
    pub success: bool,

    pub processed_tracks: Vec<ProcessedTrack>,

    /// Whether delivery was approved; `false` when the caller declined
    pub approved: bool,

    pub deliveries: Vec<DeliveryReport>,

    pub status_log: Option<PathBuf>,

    /// Set when `success` is false
    pub error: Option<String>,
}

impl RunReport {
    fn failed(run_id: Uuid, status_log: Option<PathBuf>, error: &PipelineError) -> Self {
        Self {
            run_id,
            success: false,
            processed_tracks: Vec::new(),
            approved: false,
            deliveries: Vec::new(),
            status_log,
            error: Some(error.to_string()),
        }
    }

    pub fn delivered_count(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::SkippedDuplicate))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| !o.is_success())
    }

    fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.deliveries.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Sequences resolution, building, validation and delivery for a batch
///
/// Records and files are processed one at a time, in input order.
pub struct Pipeline {
    config: CourierConfig,
    resolver: AssetResolver,
    builder: DocumentBuilder,
    validator: SchemaValidator,
    delivery: DeliveryManager,
    progress: ProgressSink,
    run_date: Option<NaiveDate>,
}

impl Pipeline {
    /// Build every component from a validated configuration
    pub fn new(config: CourierConfig) -> Result<Self> {
        config.validate()?;

        let connector = connector_for(&config)?;
        let resolver = AssetResolver::new(standard_slots(
            &config.paths.audio_dir(),
            &config.paths.wav_dir(),
            &config.paths.image_dir(),
        ))
        .with_matcher(config.assets.matcher.build(config.assets.fuzzy_threshold))
        .with_min_cover_px(config.assets.min_cover_px);

        Ok(Self {
            resolver,
            builder: DocumentBuilder::new(config.document.clone()),
            validator: SchemaValidator::new(config.schema.timeout())?,
            delivery: DeliveryManager::new(connector, config.delivery.settings()),
            progress: ProgressSink::default(),
            run_date: None,
            config,
        })
    }

    /// Deliver through `connector` instead of the configured target
    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.delivery = DeliveryManager::new(connector, self.config.delivery.settings());
        self
    }

    /// Send progress snapshots to `tx`
    pub fn with_progress(mut self, tx: mpsc::Sender<PipelineProgress>) -> Self {
        self.progress = ProgressSink::new(Some(tx));
        self
    }

    /// Fix the batch date instead of using today's
    pub fn with_run_date(mut self, date: NaiveDate) -> Self {
        self.run_date = Some(date);
        self
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Batch layout for `project`
    pub fn batch_for(&self, project: &str) -> BatchContext {
        let date = self.run_date.unwrap_or_else(|| Local::now().date_naive());
        BatchContext::new(self.config.paths.project_root(project), date)
    }

    /// Load the configured spreadsheet and prepare every record
    pub async fn prepare(&self, project: &str) -> Result<PreparedBatch> {
        let batch = self.batch_for(project);
        let input = self.config.paths.input_file();

        let mut progress = PipelineProgress::new(PipelinePhase::Loading);
        progress.current_item = Some(input.display().to_string());
        self.progress.send(&progress).await;

        let records = load_records(input).await?;
        self.prepare_records(&records, &batch).await
    }

    /// Resolve assets, build and validate the document for each record
    ///
    /// A record that fails only loses its own document; the batch continues.
    pub async fn prepare_records(
        &self,
        records: &[MetadataRecord],
        batch: &BatchContext,
    ) -> Result<PreparedBatch> {
        let log = RunLog::for_batch(batch);
        let mut prepared = PreparedBatch {
            batch: batch.clone(),
            records: Vec::with_capacity(records.len()),
            queue: Vec::new(),
        };

        let mut progress = PipelineProgress::new(PipelinePhase::Preparing);
        progress.total_records = records.len();
        self.progress.send(&progress).await;

        for record in records {
            info!(
                title = %record.title,
                isrc = %record.isrc,
                upc = %record.upc,
                "Processing track"
            );
            progress.current_item = Some(record.describe());
            self.progress.send(&progress).await;

            let outcome = self.prepare_record(record, batch, &log).await;
            prepared.queue.extend(outcome.1);
            prepared.records.push(outcome.0);

            progress.processed_records += 1;
            self.progress.send(&progress).await;
        }

        info!(
            records = prepared.records.len(),
            queued = prepared.queue.len(),
            batch = %batch.batch_root().display(),
            "Files ready for upload"
        );
        Ok(prepared)
    }

    async fn prepare_record(
        &self,
        record: &MetadataRecord,
        batch: &BatchContext,
        log: &RunLog,
    ) -> (PreparedRecord, Vec<QueuedFile>) {
        let mut prepared = PreparedRecord::new(record);
        let mut queue = Vec::new();
        let destination = batch.destination(&record.upc);

        if let Err(e) = batch.ensure_package_dir(&record.upc) {
            error!(upc = %record.upc, error = %e, "Package folder unavailable, record skipped");
            prepared.error = Some(e.to_string());
            return (prepared, queue);
        }

        let bundle = match self.resolver.resolve(record, batch) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(title = %record.title, error = %e, "Asset resolution failed");
                AssetBundle::default()
            }
        };
        for failed in &bundle.failed {
            write_status(log, log.copy_failed(failed));
        }
        for missing in &bundle.missing {
            write_status(log, log.missing(missing));
        }
        queue.extend(bundle.files.iter().map(|asset| QueuedFile {
            path: asset.path.clone(),
            destination: destination.clone(),
            kind: asset.kind,
        }));
        let image_filename = bundle.image_filename();
        prepared.missing = bundle.missing;
        prepared.rejected = bundle.rejected;
        prepared.failed = bundle.failed;

        let document = match self
            .builder
            .build(record, image_filename.as_deref(), batch, Utc::now())
        {
            Ok(document) => document.path,
            Err(e) => {
                error!(title = %record.title, error = %e, "Document build failed");
                prepared.error = Some(e.to_string());
                return (prepared, queue);
            }
        };

        let validation = self
            .validator
            .validate(&document, &self.config.schema.location)
            .await;
        if validation.valid {
            queue.push(QueuedFile {
                path: document.clone(),
                destination,
                kind: AssetKind::Document,
            });
        } else {
            warn!(
                document = %document.display(),
                problems = validation.diagnostics.len(),
                "Document excluded from delivery"
            );
            write_status(log, log.invalid_document(&document));
        }

        prepared.document = Some(document);
        prepared.validation = Some(validation);
        (prepared, queue)
    }

    /// Deliver every queued file, in order
    pub async fn deliver(&self, prepared: &PreparedBatch) -> Result<Vec<DeliveryReport>> {
        let log = prepared.status_log();
        let mut progress = PipelineProgress::new(PipelinePhase::Delivering);
        progress.total_files = prepared.queue.len();
        self.progress.send(&progress).await;

        let mut reports = Vec::with_capacity(prepared.queue.len());
        for queued in &prepared.queue {
            progress.current_item = Some(queued.path.display().to_string());
            self.progress.send(&progress).await;

            let report = self.delivery.deliver(&queued.path, &queued.destination).await;
            if let DeliveryOutcome::PermanentlyFailed { reason } = &report.outcome {
                write_status(&log, log.permanent_failure(&report.file, reason));
                progress.failed_files += 1;
            } else {
                progress.delivered_files += 1;
            }
            self.progress.send(&progress).await;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Prepare, ask for approval, deliver
    ///
    /// `approve` is consulted between preparation and delivery when
    /// `delivery.require_confirmation` is set. Unexpected errors never
    /// escape: they are written to the status log as `RUN FAILED: ...` and
    /// reported with `success = false`.
    pub async fn process_and_upload<F>(&self, project: &str, approve: F) -> RunReport
    where
        F: FnOnce(&PreparedBatch) -> bool,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, project);

        async {
            info!("Starting run");
            let log = RunLog::for_batch(&self.batch_for(project));
            match self.run(run_id, project, approve).await {
                Ok(report) => {
                    info!(
                        delivered = report.delivered_count(),
                        skipped = report.skipped_count(),
                        failed = report.failed_count(),
                        "Run finished"
                    );
                    report
                }
                Err(e) => {
                    error!(error = %e, "Run failed");
                    write_status(&log, log.run_failed(&e));
                    let mut progress = PipelineProgress::new(PipelinePhase::Finished);
                    progress.message = Some(e.to_string());
                    self.progress.send(&progress).await;
                    RunReport::failed(run_id, Some(log.path().to_path_buf()), &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run<F>(&self, run_id: Uuid, project: &str, approve: F) -> Result<RunReport>
    where
        F: FnOnce(&PreparedBatch) -> bool,
    {
        let prepared = self.prepare(project).await?;
        let processed_tracks = prepared
            .records
            .iter()
            .filter(|r| r.document.is_some())
            .map(|r| ProcessedTrack {
                upc: r.record.upc.clone(),
                title: r.record.title.clone(),
                document_valid: r.document_valid(),
            })
            .collect();

        let approved = if self.config.delivery.require_confirmation {
            self.progress
                .send(&PipelineProgress::new(PipelinePhase::AwaitingApproval))
                .await;
            approve(&prepared)
        } else {
            true
        };

        let deliveries = if approved {
            self.deliver(&prepared).await?
        } else {
            info!(queued = prepared.queue.len(), "Upload declined, nothing delivered");
            Vec::new()
        };

        let mut progress = PipelineProgress::new(PipelinePhase::Finished);
        progress.total_records = prepared.records.len();
        progress.processed_records = prepared.records.len();
        progress.total_files = prepared.queue.len();
        progress.delivered_files = deliveries.iter().filter(|r| r.outcome.is_success()).count();
        progress.failed_files = deliveries.len() - progress.delivered_files;
        self.progress.send(&progress).await;

        Ok(RunReport {
            run_id,
            success: true,
            processed_tracks,
            approved,
            deliveries,
            status_log: Some(prepared.status_log().path().to_path_buf()),
            error: None,
        })
    }
}

/// A status line that cannot be written is logged; the batch carries on
fn write_status(log: &RunLog, written: std::io::Result<()>) {
    if let Err(e) = written {
        error!(log = %log.path().display(), error = %e, "Could not write status log");
    }
}

async fn load_records(input: PathBuf) -> Result<Vec<MetadataRecord>> {
    let records =
        tokio::task::spawn_blocking(move || courier_ingest::load_records(&input)).await??;
    info!(records = records.len(), "Records loaded");
    Ok(records)
}

fn connector_for(config: &CourierConfig) -> Result<Arc<dyn RemoteConnector>> {
    match config.delivery.target {
        DeliveryTarget::Ftp => Ok(Arc::new(FtpConnector::new(config.delivery.ftp()))),
        DeliveryTarget::Local => {
            let root = config.delivery.local_root(&config.paths);
            std::fs::create_dir_all(&root)?;
            Ok(Arc::new(LocalDirConnector::new(root)))
        }
    }
}

/// Validate a single document outside a run
pub async fn validate_document(config: &CourierConfig, document: &Path) -> Result<ValidationReport> {
    let validator = SchemaValidator::new(config.schema.timeout())?;
    Ok(validator.validate(document, &config.schema.location).await)
}
