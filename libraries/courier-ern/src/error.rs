//! Error types for document building and schema handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Failure to build or write a release document
#[derive(Debug, Error)]
pub enum BuildError {
    /// A field the document cannot be built without is empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Package folder error: {0}")]
    Package(#[from] courier_core::CoreError),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to obtain or understand a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to fetch schema {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read schema {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema is not well-formed XML: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Not an XML Schema: {0}")]
    NotASchema(String),
}
