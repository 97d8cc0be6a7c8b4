//! FTP transport
//!
//! suppaftp's synchronous client runs on tokio's blocking pool. The stream is
//! moved into each blocking task and handed back when the task finishes.

use crate::error::{DeliveryError, Result};
use crate::transport::{base_name, RemoteConnector, RemoteSession};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, info};

/// FTP server and credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for FtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FtpSettings {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 21,
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Connects to an FTP server with binary transfer mode
pub struct FtpConnector {
    settings: FtpSettings,
}

impl FtpConnector {
    pub fn new(settings: FtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl RemoteConnector for FtpConnector {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        let settings = self.settings.clone();
        let stream = tokio::task::spawn_blocking(move || open(&settings)).await??;
        Ok(Box::new(FtpSession {
            stream: Some(stream),
        }))
    }

    fn describe(&self) -> String {
        format!("ftp://{}@{}:{}", self.settings.username, self.settings.host, self.settings.port)
    }
}

fn open(settings: &FtpSettings) -> Result<FtpStream> {
    let address = (settings.host.as_str(), settings.port)
        .to_socket_addrs()
        .map_err(|e| DeliveryError::Connect(format!("{}: {e}", settings.host)))?
        .next()
        .ok_or_else(|| DeliveryError::Connect(format!("{}: no address", settings.host)))?;

    let mut stream = FtpStream::connect_timeout(address, settings.timeout)?;
    stream.get_ref().set_read_timeout(Some(settings.timeout))?;
    stream.get_ref().set_write_timeout(Some(settings.timeout))?;
    stream.login(settings.username.as_str(), settings.password.as_str())?;
    stream.transfer_type(FileType::Binary)?;

    info!(host = %settings.host, port = settings.port, "Connected to FTP server");
    Ok(stream)
}

/// An authenticated FTP control connection
pub struct FtpSession {
    stream: Option<FtpStream>,
}

impl FtpSession {
    async fn run<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> Result<T> + Send + 'static,
    {
        let mut stream = self.stream.take().ok_or(DeliveryError::Closed)?;
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await?;
        self.stream = Some(stream);
        result
    }
}

#[async_trait]
impl RemoteSession for FtpSession {
    async fn change_dir(&mut self, dir: &str) -> Result<()> {
        let dir = dir.to_string();
        self.run(move |ftp| Ok(ftp.cwd(&dir)?)).await
    }

    async fn make_dir(&mut self, dir: &str) -> Result<()> {
        let dir = dir.to_string();
        self.run(move |ftp| Ok(ftp.mkdir(&dir)?)).await
    }

    async fn list_names(&mut self) -> Result<Vec<String>> {
        self.run(|ftp| {
            let entries = match ftp.nlst(None) {
                Ok(entries) => entries,
                Err(e) if is_empty_listing(&e) => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            Ok(entries
                .iter()
                .map(|entry| base_name(entry).to_string())
                .collect())
        })
        .await
    }

    async fn upload(&mut self, local: &Path, name: &str) -> Result<()> {
        let local = local.to_path_buf();
        let name = name.to_string();
        self.run(move |ftp| {
            let mut file = File::open(&local)?;
            let bytes = ftp.put_file(&name, &mut file)?;
            debug!(file = %name, bytes, "Stored file");
            Ok(())
        })
        .await
    }

    async fn download(&mut self, name: &str) -> Result<Vec<u8>> {
        let name = name.to_string();
        self.run(move |ftp| Ok(ftp.retr_as_buffer(&name)?.into_inner()))
            .await
    }

    async fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        let result = self.run(|ftp| Ok(ftp.quit()?)).await;
        self.stream = None;
        result
    }
}

/// Servers such as ProFTPD answer NLST on an empty directory with 450 or 550
fn is_empty_listing(error: &FtpError) -> bool {
    matches!(
        error,
        FtpError::UnexpectedResponse(response)
            if matches!(response.status, Status::RequestFileActionIgnored | Status::FileUnavailable)
    )
}
