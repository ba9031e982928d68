//! Chunk loop
//!
//! Stop requests are honoured between chunks only; a chunk that has
//! started runs to its commit or its failure.

use super::reader::{PageReader, ReadOutcome};
use super::{JobError, JobKind, JobReport, ProcessError, ProcessFailure};
use crate::models::Page;
use crate::store::ComicStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comix_common::events::{JobRunStatus, ProgressStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-page step
///
/// `Ok(None)` means the page needs no write.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, page: Page) -> Result<Option<Page>, ProcessError>;
}

/// Persists one chunk atomically
#[async_trait]
pub trait ItemWriter: Send + Sync {
    async fn write(&self, pages: &[Page]) -> comix_common::Result<()>;
}

/// Writes pages back through the store
pub struct StorePageWriter {
    store: Arc<dyn ComicStore>,
}

impl StorePageWriter {
    pub fn new(store: Arc<dyn ComicStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemWriter for StorePageWriter {
    async fn write(&self, pages: &[Page]) -> comix_common::Result<()> {
        self.store.save_pages(pages).await
    }
}

/// Observer of chunk and job boundaries
pub trait ChunkListener: Send + Sync {
    fn before_chunk(&self, _progress: &ProgressStatus) {}

    fn after_chunk(&self, _progress: &ProgressStatus) {}

    /// Called once a run ends, whatever the outcome
    fn after_job(&self, _progress: &ProgressStatus, _report: &JobReport) {}
}

/// One run of a chunked job
pub struct ChunkedJob {
    kind: JobKind,
    reader: PageReader,
    processor: Arc<dyn ItemProcessor>,
    writer: Arc<dyn ItemWriter>,
    listeners: Vec<Arc<dyn ChunkListener>>,
}

struct RunState {
    started_at: DateTime<Utc>,
    total: u64,
    read: u64,
    written: u64,
    chunks: u64,
    failures: Vec<ProcessFailure>,
}

impl ChunkedJob {
    pub fn new(
        kind: JobKind,
        reader: PageReader,
        processor: Arc<dyn ItemProcessor>,
        writer: Arc<dyn ItemWriter>,
    ) -> Self {
        Self {
            kind,
            reader,
            processor,
            writer,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChunkListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    fn progress(&self, state: &RunState, active: bool) -> ProgressStatus {
        ProgressStatus {
            job: self.kind.as_str().to_string(),
            processed: state.read,
            total: state.total,
            started_at: state.started_at,
            active,
        }
    }

    fn report(&self, state: RunState, status: JobRunStatus) -> JobReport {
        JobReport {
            job: self.kind,
            status,
            read: state.read,
            written: state.written,
            chunks: state.chunks,
            failures: state.failures,
            started_at: state.started_at,
            finished_at: Utc::now(),
        }
    }

    fn finish(&self, state: RunState, status: JobRunStatus) -> JobReport {
        let progress = self.progress(&state, false);
        let report = self.report(state, status);
        for listener in &self.listeners {
            listener.after_job(&progress, &report);
        }
        report
    }

    /// Run until end of data, a stop request, or a reader/writer failure
    pub async fn run(mut self, stop: &CancellationToken) -> Result<JobReport, JobError> {
        let chunk_size = self.reader.chunk_size();
        let total = self.reader.pending().await.map_err(JobError::Reader)?;
        let mut state = RunState {
            started_at: Utc::now(),
            total,
            read: 0,
            written: 0,
            chunks: 0,
            failures: Vec::new(),
        };

        info!(job = %self.kind, total, chunk_size, "Job started");

        loop {
            if stop.is_cancelled() {
                info!(job = %self.kind, read = state.read, "Job stopped between chunks");
                return Ok(self.finish(state, JobRunStatus::Stopped));
            }

            let progress = self.progress(&state, true);
            for listener in &self.listeners {
                listener.before_chunk(&progress);
            }

            let mut items = Vec::with_capacity(chunk_size);
            let mut end_of_data = false;
            while items.len() < chunk_size {
                match self.reader.read().await {
                    Ok(ReadOutcome::Item(page)) => items.push(page),
                    Ok(ReadOutcome::EndOfData) => {
                        end_of_data = true;
                        break;
                    }
                    Err(e) => {
                        warn!(job = %self.kind, error = %e, "Reader failed");
                        self.finish(state, JobRunStatus::Failed);
                        return Err(JobError::Reader(e));
                    }
                }
            }

            if items.is_empty() {
                break;
            }

            let chunk = state.chunks + 1;
            let read = items.len() as u64;
            let mut outputs = Vec::with_capacity(items.len());

            for page in items {
                let page_id = page.id;
                let comic_id = page.comic_id;
                match self.processor.process(page).await {
                    Ok(Some(updated)) => outputs.push(updated),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            job = %self.kind,
                            page_id = %page_id,
                            comic_id = %comic_id,
                            error = %e,
                            "Page processing failed, continuing chunk"
                        );
                        state.failures.push(ProcessFailure {
                            page_id,
                            comic_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            if !outputs.is_empty() {
                if let Err(source) = self.writer.write(&outputs).await {
                    warn!(job = %self.kind, chunk, error = %source, "Writer failed");
                    self.finish(state, JobRunStatus::Failed);
                    return Err(JobError::Writer { chunk, source });
                }
            }

            state.read += read;
            state.written += outputs.len() as u64;
            state.chunks = chunk;

            debug!(
                job = %self.kind,
                chunk,
                read,
                written = outputs.len(),
                "Chunk committed"
            );

            let progress = self.progress(&state, true);
            for listener in &self.listeners {
                listener.after_chunk(&progress);
            }

            if end_of_data {
                break;
            }
        }

        let report = self.finish(state, JobRunStatus::Completed);
        info!(
            job = %self.kind,
            read = report.read,
            written = report.written,
            failures = report.failures.len(),
            "Job completed"
        );
        Ok(report)
    }
}
