use std::io::Write;

use serde::Serialize;
use ytripper_core::core::events::{
    DownloadComplete, EventEmitter, EventEnvelope, COMPLETE_EVENT, PROGRESS_EVENT,
};
use ytripper_core::models::job::JobOutcome;

/// Writes each event to stdout as one JSON line.
#[derive(Clone, Copy, Default)]
pub struct StdoutEventEmitter;

pub fn event_line<T: Serialize>(event: &str, payload: T) -> serde_json::Result<String> {
    serde_json::to_string(&EventEnvelope { event, payload })
}

impl StdoutEventEmitter {
    fn emit<T: Serialize>(&self, event: &str, payload: T) {
        match event_line(event, payload) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{}", line);
                let _ = out.flush();
            }
            Err(e) => tracing::warn!("Failed to encode {} event: {}", event, e),
        }
    }
}

impl EventEmitter for StdoutEventEmitter {
    fn emit_progress(&self, percent: f64) {
        self.emit(PROGRESS_EVENT, percent);
    }

    fn emit_complete(&self, outcome: &JobOutcome) {
        self.emit(COMPLETE_EVENT, DownloadComplete::from(outcome));
    }
}
