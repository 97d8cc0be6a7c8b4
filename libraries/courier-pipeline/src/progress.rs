//! Run progress events

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Loading,
    Preparing,
    AwaitingApproval,
    Delivering,
    Finished,
}

/// Snapshot sent to an optional progress listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub phase: PipelinePhase,

    pub total_records: usize,
    pub processed_records: usize,

    /// Files queued for delivery
    pub total_files: usize,
    pub delivered_files: usize,
    pub failed_files: usize,

    /// Record or file being worked on
    pub current_item: Option<String>,

    pub message: Option<String>,
}

impl PipelineProgress {
    pub fn new(phase: PipelinePhase) -> Self {
        Self {
            phase,
            total_records: 0,
            processed_records: 0,
            total_files: 0,
            delivered_files: 0,
            failed_files: 0,
            current_item: None,
            message: None,
        }
    }

    /// Percentage of the current phase's work done
    pub fn percentage(&self) -> f32 {
        let (done, total) = match self.phase {
            PipelinePhase::Delivering => (self.delivered_files + self.failed_files, self.total_files),
            PipelinePhase::Finished => return 100.0,
            _ => (self.processed_records, self.total_records),
        };
        if total == 0 {
            return 0.0;
        }
        (done as f32 / total as f32) * 100.0
    }
}

/// Sends progress if someone is listening
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressSink {
    tx: Option<mpsc::Sender<PipelineProgress>>,
}

impl ProgressSink {
    pub(crate) fn new(tx: Option<mpsc::Sender<PipelineProgress>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn send(&self, progress: &PipelineProgress) {
        if let Some(tx) = &self.tx {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(progress.clone()).await;
        }
    }
}
