//! Schema validation of generated documents

use crate::error::SchemaError;
use crate::schema::Schema;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Pass/fail verdict with the reasons for a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    pub fn passed() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<String>) -> Self {
        Self {
            valid: false,
            diagnostics,
        }
    }
}

/// Validates documents against a local or remote XML Schema
///
/// The schema is loaded on every call; nothing is cached between documents.
/// Every failure, including an unreachable or malformed schema, is reported
/// as a failed validation rather than an error.
pub struct SchemaValidator {
    http: Client,
}

impl SchemaValidator {
    pub fn new(timeout: Duration) -> Result<Self, SchemaError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(format!("ddex-courier/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SchemaError::Fetch {
                location: "client".to_string(),
                source,
            })?;
        Ok(Self { http })
    }

    /// Validate `document` against the schema at `location` (path or URL)
    pub async fn validate(&self, document: &Path, location: &str) -> ValidationReport {
        let schema = match self.load_schema(location).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(schema = location, error = %e, "Schema unavailable");
                return ValidationReport::failed(vec![format!("Schema unavailable: {e}")]);
            }
        };

        let xml = match tokio::fs::read_to_string(document).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(document = %document.display(), error = %e, "Document unreadable");
                return ValidationReport::failed(vec![format!(
                    "Cannot read {}: {e}",
                    document.display()
                )]);
            }
        };

        let diagnostics = schema.validate_str(&xml);
        if diagnostics.is_empty() {
            info!(document = %document.display(), "XML validation passed");
            ValidationReport::passed()
        } else {
            warn!(
                document = %document.display(),
                errors = diagnostics.len(),
                first = %diagnostics[0],
                "XML validation failed"
            );
            ValidationReport::failed(diagnostics)
        }
    }

    /// Fetch or read a schema and parse it
    pub async fn load_schema(&self, location: &str) -> Result<Schema, SchemaError> {
        let text = if is_remote(location) {
            self.fetch(location).await?
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SchemaError::Read {
                    location: location.to_string(),
                    source,
                })?
        };
        Schema::parse(&text)
    }

    async fn fetch(&self, location: &str) -> Result<String, SchemaError> {
        let fetch_error = |source| SchemaError::Fetch {
            location: location.to_string(),
            source,
        };

        let response = self
            .http
            .get(location)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_error)?;
        response.text().await.map_err(fetch_error)
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://ddex.net/xml/ern/383/release-notification.xsd"));
        assert!(is_remote("https://example.com/a.xsd"));
        assert!(!is_remote("schemas/release-notification.xsd"));
        assert!(!is_remote("file:///srv/schemas/a.xsd"));
    }
}
