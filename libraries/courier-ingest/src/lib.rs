//! Release metadata loading
//!
//! Turns a release spreadsheet (or a JSON export of one) into normalized
//! [`MetadataRecord`]s. Every field the pipeline relies on is present after
//! loading: missing cells are replaced with sentinel defaults and numeric
//! identifier cells are rendered as plain digit strings.
//!
//! Supported inputs:
//! - `.xlsx`, `.xlsm`, `.xls`, `.ods`: first worksheet, header row first
//! - `.json`: an array of row objects
//!
//! ```rust,no_run
//! let records = courier_ingest::load_records("choir.xlsx".as_ref())?;
//! for record in &records {
//!     println!("{}", record.describe());
//! }
//! # Ok::<(), courier_ingest::IngestError>(())
//! ```

pub mod error;
mod loader;
mod normalize;

pub use courier_core::MetadataRecord;
pub use error::{IngestError, Result};
pub use loader::{load_json, load_records, load_workbook};
pub use normalize::{normalize_header, record_from_row, Cell, RawRow};
