//! Release package delivery
//!
//! Uploads package files to a remote server, one file at a time, through a
//! pluggable transport:
//!
//! - [`FtpConnector`]: FTP with binary transfers
//! - [`LocalDirConnector`]: a local directory mirroring the remote layout
//!
//! [`DeliveryManager`] owns the retry policy and duplicate detection and
//! reports a [`DeliveryOutcome`](courier_core::DeliveryOutcome) per file.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_core::DestinationKey;
//! use courier_delivery::{DeliveryManager, DeliverySettings, LocalDirConnector};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let manager = DeliveryManager::new(
//!     Arc::new(LocalDirConnector::new("/srv/outbox")),
//!     DeliverySettings::default(),
//! );
//! let destination = DestinationKey::new("20250301", "00012345");
//! let report = manager.deliver("cover.jpg".as_ref(), &destination).await;
//! println!("{}: {}", report.file.display(), report.outcome);
//! # }
//! ```

pub mod error;
mod ftp;
mod local;
mod manager;
mod transport;

pub use error::{DeliveryError, Result};
pub use ftp::{FtpConnector, FtpSession, FtpSettings};
pub use local::{LocalDirConnector, LocalSession};
pub use manager::{DeliveryManager, DeliveryReport, DeliverySettings, DeliveryState};
pub use transport::{ensure_dir, RemoteConnector, RemoteSession};
