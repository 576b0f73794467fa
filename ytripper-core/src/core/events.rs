use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::job::{JobOutcome, MediaKind};

pub const PROGRESS_EVENT: &str = "progress-update";
pub const COMPLETE_EVENT: &str = "download-complete";

/// Receives a job's notifications. `emit_complete` is called once per job and
/// nothing follows it.
pub trait EventEmitter: Send + Sync + Clone + 'static {
    fn emit_progress(&self, percent: f64);
    fn emit_complete(&self, outcome: &JobOutcome);
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(f64),
    Complete(JobOutcome),
}

#[derive(Clone)]
pub struct ChannelEventEmitter {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelEventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventEmitter for ChannelEventEmitter {
    fn emit_progress(&self, percent: f64) {
        let _ = self.tx.send(JobEvent::Progress(percent));
    }

    fn emit_complete(&self, outcome: &JobOutcome) {
        let _ = self.tx.send(JobEvent::Complete(outcome.clone()));
    }
}

/// `download-complete` payload as the front-end reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DownloadComplete {
    Success {
        #[serde(rename = "type")]
        media_type: MediaKind,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl From<&JobOutcome> for DownloadComplete {
    fn from(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Success(kind) => DownloadComplete::Success { media_type: *kind },
            JobOutcome::Failure { detail, .. } => DownloadComplete::Error {
                message: detail.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventEnvelope<'a, T: Serialize> {
    pub event: &'a str,
    pub payload: T,
}
