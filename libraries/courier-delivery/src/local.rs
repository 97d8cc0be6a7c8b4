//! Local directory transport
//!
//! Mirrors the remote layout under a local root. Used for staging and dry
//! runs, and behaves like the FTP transport: creating a directory needs the
//! parent to exist and fails if the directory is already there.

use crate::error::{DeliveryError, Result};
use crate::transport::{RemoteConnector, RemoteSession};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Delivers into a directory on the local filesystem
pub struct LocalDirConnector {
    root: PathBuf,
}

impl LocalDirConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl RemoteConnector for LocalDirConnector {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        if !tokio::fs::metadata(&self.root).await?.is_dir() {
            return Err(DeliveryError::Connect(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(Box::new(LocalSession::new(self.root.clone())))
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

/// Session over a local root; the current directory starts at the root
pub struct LocalSession {
    root: PathBuf,
    cwd: PathBuf,
}

impl LocalSession {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            cwd: root.clone(),
            root,
        }
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        let relative = dir.trim_start_matches('/');
        if dir.starts_with('/') {
            self.root.join(relative)
        } else {
            self.cwd.join(relative)
        }
    }

    fn entry(&self, name: &str) -> PathBuf {
        self.cwd.join(name)
    }
}

#[async_trait]
impl RemoteSession for LocalSession {
    async fn change_dir(&mut self, dir: &str) -> Result<()> {
        let target = self.resolve(dir);
        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => {
                self.cwd = target;
                Ok(())
            }
            Ok(_) => Err(DeliveryError::remote(dir, "not a directory")),
            Err(e) => Err(DeliveryError::remote(dir, e)),
        }
    }

    async fn make_dir(&mut self, dir: &str) -> Result<()> {
        tokio::fs::create_dir(self.resolve(dir))
            .await
            .map_err(|e| DeliveryError::remote(dir, e))
    }

    async fn list_names(&mut self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.cwd).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn upload(&mut self, local: &Path, name: &str) -> Result<()> {
        let target = self.entry(name);
        let bytes = tokio::fs::copy(local, &target).await?;
        debug!(file = %target.display(), bytes, "Stored file");
        Ok(())
    }

    async fn download(&mut self, name: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.entry(name)).await?)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
