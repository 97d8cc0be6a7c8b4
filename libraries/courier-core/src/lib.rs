//! DDEX Courier Core
//!
//! Domain types and error handling shared by every stage of the release
//! delivery pipeline.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Records**: `MetadataRecord`, one normalized spreadsheet row per track
//! - **Durations**: `TrackDuration` and the `PTxMyS` normalization rule
//! - **Batches**: `BatchContext`, the run-date scoped local and remote layout
//! - **Delivery**: `DestinationKey` and `DeliveryOutcome`
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use courier_core::{BatchContext, MetadataRecord};
//! use chrono::NaiveDate;
//!
//! let record = MetadataRecord::new("Test Song", "US123", "00012345").with_duration("3:45");
//! assert_eq!(record.formatted_duration(), "PT3M45S");
//!
//! let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let batch = BatchContext::new("/srv/ddex", date);
//! assert_eq!(batch.document_file_name(&record), "00012345_Test_Song_20250301.xml");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod naming;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{
    format_duration, AssetKind, BatchContext, DeliveryOutcome, DestinationKey, MetadataRecord,
    TrackDuration,
};
