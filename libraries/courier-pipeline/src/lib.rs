//! DDEX Courier pipeline
//!
//! Runs a release batch end to end:
//!
//! 1. load the release spreadsheet into metadata records
//! 2. per record: resolve and copy media, build the ERN document, validate it
//! 3. ask the caller for approval (optional)
//! 4. deliver the queued files and write problems to the status log
//!
//! ```rust,no_run
//! use courier_pipeline::{CourierConfig, Pipeline};
//!
//! # async fn run() -> courier_pipeline::Result<()> {
//! let config = CourierConfig::load(None)?;
//! let pipeline = Pipeline::new(config)?;
//!
//! let report = pipeline
//!     .process_and_upload("Choir", |prepared| !prepared.queue.is_empty())
//!     .await;
//! println!("success: {}, tracks: {}", report.success, report.processed_tracks.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod pipeline;
mod progress;
mod run_log;

pub use config::{CourierConfig, DeliveryTarget, DEFAULT_CONFIG_FILE, DEFAULT_SCHEMA_LOCATION};
pub use error::{PipelineError, Result};
pub use pipeline::{
    validate_document, Pipeline, PreparedBatch, PreparedRecord, ProcessedTrack, QueuedFile,
    RunReport,
};
pub use progress::{PipelinePhase, PipelineProgress};
pub use run_log::RunLog;
