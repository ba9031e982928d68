//! Progress publication
//!
//! Publishing is fire-and-forget: a bus with no subscribers is logged and
//! the job carries on.

use super::job::ChunkListener;
use super::JobReport;
use chrono::Utc;
use comix_common::events::{ComixEvent, EventBus, ProgressStatus};
use tracing::trace;

/// Publishes progress to the event bus before and after every chunk
pub struct ProgressListener {
    events: EventBus,
}

impl ProgressListener {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }

    fn publish(&self, event: ComixEvent) {
        if let Err(e) = self.events.emit(event) {
            trace!(event = ?e.0, "No subscribers for job event");
        }
    }
}

impl ChunkListener for ProgressListener {
    fn before_chunk(&self, progress: &ProgressStatus) {
        self.publish(ComixEvent::JobProgress(progress.clone()));
    }

    fn after_chunk(&self, progress: &ProgressStatus) {
        self.publish(ComixEvent::JobProgress(progress.clone()));
    }

    fn after_job(&self, progress: &ProgressStatus, report: &JobReport) {
        self.publish(ComixEvent::JobProgress(progress.clone()));
        self.publish(ComixEvent::JobCompleted {
            job: report.job.as_str().to_string(),
            status: report.status,
            written: report.written,
            failures: report.failures.len() as u64,
            timestamp: Utc::now(),
        });
    }
}
