//! Transport seam between the delivery manager and a remote server

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Opens authenticated sessions against one remote target
///
/// The manager asks for a fresh session on every delivery attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Connect and authenticate
    async fn connect(&self) -> Result<Box<dyn RemoteSession>>;

    /// Human-readable target, used in logs
    fn describe(&self) -> String;
}

/// One connected session
///
/// Directory paths are absolute remote paths such as `/BATCH_20250301`.
/// File names are relative to the current directory.
#[async_trait]
pub trait RemoteSession: Send {
    /// Make `dir` the current directory; fails if it does not exist
    async fn change_dir(&mut self, dir: &str) -> Result<()>;

    /// Create `dir`; its parent must exist
    async fn make_dir(&mut self, dir: &str) -> Result<()>;

    /// Base names of the entries in the current directory
    async fn list_names(&mut self) -> Result<Vec<String>>;

    /// Binary upload of `local` as `name`, replacing any existing entry
    async fn upload(&mut self, local: &Path, name: &str) -> Result<()>;

    /// Fetch the content of `name`
    async fn download(&mut self, name: &str) -> Result<Vec<u8>>;

    /// End the session
    async fn close(&mut self) -> Result<()>;
}

/// Make `dir` the current directory, creating it if needed
///
/// A failed create is not an error by itself (the directory may already
/// exist); the second change decides.
pub async fn ensure_dir(session: &mut dyn RemoteSession, dir: &str) -> Result<()> {
    if session.change_dir(dir).await.is_ok() {
        return Ok(());
    }
    if let Err(e) = session.make_dir(dir).await {
        tracing::debug!(dir, error = %e, "Create directory refused, checking existence");
    }
    session.change_dir(dir).await
}

/// Last path component of a listing entry
pub(crate) fn base_name(entry: &str) -> &str {
    entry
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("cover.jpg"), "cover.jpg");
        assert_eq!(base_name("./cover.jpg"), "cover.jpg");
        assert_eq!(base_name("/BATCH_20250301/00012345/cover.jpg"), "cover.jpg");
        assert_eq!(base_name("nested/"), "nested");
    }
}
