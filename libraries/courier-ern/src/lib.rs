//! ERN release notification documents
//!
//! Builds DDEX ERN 3.8.3 `NewReleaseMessage` documents from metadata records
//! and validates them against an XML Schema.
//!
//! # Building
//!
//! [`DocumentBuilder`] maps one [`MetadataRecord`](courier_core::MetadataRecord)
//! (plus the copied cover file name, if any) to an [`Element`] tree and writes
//! it into the record's package folder as
//! `<UPC>_<Title>_<YYYYMMDD>.xml`.
//!
//! # Validating
//!
//! [`SchemaValidator`] loads a schema from a path or URL on every call and
//! checks the document with the structural subset implemented in [`Schema`].
//! Schema problems never abort a batch; they come back as a failed
//! [`ValidationReport`].
//!
//! ```rust,no_run
//! use courier_core::{BatchContext, MetadataRecord};
//! use courier_ern::{DocumentBuilder, SchemaValidator};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let batch = BatchContext::today("/srv/ddex");
//! let record = MetadataRecord::new("Test Song", "US123", "00012345").with_duration("3:45");
//!
//! let built = DocumentBuilder::default().build(&record, None, &batch, chrono::Utc::now())?;
//! let report = SchemaValidator::new(Duration::from_secs(30))?
//!     .validate(&built.path, "http://ddex.net/xml/ern/383/release-notification.xsd")
//!     .await;
//! println!("valid: {}", report.valid);
//! # Ok(())
//! # }
//! ```

mod builder;
pub mod error;
mod ids;
mod profile;
mod schema;
mod tree;
mod validator;

pub use builder::{BuiltDocument, DocumentBuilder};
pub use error::{BuildError, Result, SchemaError};
pub use ids::{IdentifierMode, IdentifierSource};
pub use profile::{
    DocumentProfile, AVS_NAMESPACE, ERN_NAMESPACE, MESSAGE_SCHEMA_VERSION, SCHEMA_LOCATION,
    XSI_NAMESPACE,
};
pub use schema::Schema;
pub use tree::{Element, Node};
pub use validator::{SchemaValidator, ValidationReport};
