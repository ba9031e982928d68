//! Job scheduler
//!
//! Runs page jobs with one job per resource at a time, keeps a stop token
//! for the running job and an execution history.

use super::hash_pages::HashPageProcessor;
use super::job::{ChunkedJob, ItemProcessor, StorePageWriter};
use super::listeners::ProgressListener;
use super::mark_pages::{MarkForDeletionProcessor, UnmarkForDeletionProcessor};
use super::reader::{PageQuery, PageReader};
use super::{JobError, JobKind, JobReport, JobRequest};
use crate::archive::ArchiveLoader;
use crate::models::PageState;
use crate::store::ComicStore;
use chrono::{DateTime, Utc};
use comix_common::events::{ComixEvent, EventBus, JobRunStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Builds job runs from requests
#[derive(Clone)]
pub struct JobFactory {
    store: Arc<dyn ComicStore>,
    loader: ArchiveLoader,
    events: EventBus,
    chunk_size: usize,
}

impl JobFactory {
    pub fn new(
        store: Arc<dyn ComicStore>,
        loader: ArchiveLoader,
        events: EventBus,
        chunk_size: usize,
    ) -> Self {
        Self {
            store,
            loader,
            events,
            chunk_size,
        }
    }

    pub fn build(&self, request: &JobRequest) -> Result<ChunkedJob, JobError> {
        let (query, processor): (PageQuery, Arc<dyn ItemProcessor>) = match request {
            JobRequest::ComputeMissingHash => (
                PageQuery::WithoutHash,
                Arc::new(HashPageProcessor::new(self.store.clone(), self.loader.clone())),
            ),
            JobRequest::MarkBlockedPages => {
                (PageQuery::UnmarkedBlocked, Arc::new(MarkForDeletionProcessor))
            }
            JobRequest::MarkPagesByHash { hash } => (
                PageQuery::ByHash {
                    hash: target_hash(hash)?,
                    state: PageState::Stable,
                },
                Arc::new(MarkForDeletionProcessor),
            ),
            JobRequest::UnmarkPagesByHash { hash } => (
                PageQuery::ByHash {
                    hash: target_hash(hash)?,
                    state: PageState::MarkedForDeletion,
                },
                Arc::new(UnmarkForDeletionProcessor),
            ),
        };

        let reader = PageReader::new(self.store.clone(), query, self.chunk_size);
        let writer = Arc::new(StorePageWriter::new(self.store.clone()));

        Ok(ChunkedJob::new(request.kind(), reader, processor, writer)
            .with_listener(Arc::new(ProgressListener::new(self.events.clone()))))
    }
}

fn target_hash(hash: &str) -> Result<String, JobError> {
    let hash = hash.trim();
    if hash.is_empty() {
        return Err(JobError::InvalidParameter("target hash is empty".to_string()));
    }
    Ok(hash.to_ascii_lowercase())
}

/// One finished job run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobExecution {
    pub id: Uuid,
    pub job: JobKind,
    pub status: JobRunStatus,
    pub read: u64,
    pub written: u64,
    pub failures: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct RunningJob {
    kind: JobKind,
    stop: CancellationToken,
}

/// Releases the resource when the run ends, including on panic
struct ResourceGuard<'a> {
    running: &'a Mutex<HashMap<&'static str, RunningJob>>,
    resource: &'static str,
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(self.resource);
        }
    }
}

pub struct JobScheduler {
    factory: JobFactory,
    events: EventBus,
    running: Mutex<HashMap<&'static str, RunningJob>>,
    history: Mutex<Vec<JobExecution>>,
}

impl JobScheduler {
    pub fn new(factory: JobFactory) -> Self {
        let events = factory.events.clone();
        Self {
            factory,
            events,
            running: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Run a job to completion
    ///
    /// Fails at once with [`JobError::AlreadyRunning`] when another job
    /// holds the same resource.
    pub async fn run(&self, request: JobRequest) -> Result<JobReport, JobError> {
        let kind = request.kind();
        let job = self.factory.build(&request)?;
        let (stop, _guard) = self.acquire(kind)?;

        let started_at = Utc::now();
        let outcome = job.run(&stop).await;
        self.record(kind, started_at, &outcome);

        if let Err(e) = &outcome {
            self.events.emit_lossy(ComixEvent::JobCompleted {
                job: kind.as_str().to_string(),
                status: JobRunStatus::Failed,
                written: 0,
                failures: 0,
                timestamp: Utc::now(),
            });
            warn!(job = %kind, error = %e, "Job run failed");
        }
        outcome
    }

    fn acquire(&self, kind: JobKind) -> Result<(CancellationToken, ResourceGuard<'_>), JobError> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(current) = running.get(kind.resource()) {
            return Err(JobError::AlreadyRunning(current.kind));
        }

        let stop = CancellationToken::new();
        running.insert(
            kind.resource(),
            RunningJob {
                kind,
                stop: stop.clone(),
            },
        );
        Ok((
            stop,
            ResourceGuard {
                running: &self.running,
                resource: kind.resource(),
            },
        ))
    }

    fn record(&self, kind: JobKind, started_at: DateTime<Utc>, outcome: &Result<JobReport, JobError>) {
        let execution = match outcome {
            Ok(report) => JobExecution {
                id: Uuid::new_v4(),
                job: kind,
                status: report.status,
                read: report.read,
                written: report.written,
                failures: report.failures.len() as u64,
                error: None,
                started_at: report.started_at,
                finished_at: report.finished_at,
            },
            Err(e) => JobExecution {
                id: Uuid::new_v4(),
                job: kind,
                status: JobRunStatus::Failed,
                read: 0,
                written: 0,
                failures: 0,
                error: Some(e.to_string()),
                started_at,
                finished_at: Utc::now(),
            },
        };

        info!(job = %kind, status = %execution.status, "Job execution recorded");
        if let Ok(mut history) = self.history.lock() {
            history.push(execution);
        }
    }

    /// Ask the running job of this kind to stop after its current chunk
    pub fn stop(&self, kind: JobKind) -> bool {
        let Ok(running) = self.running.lock() else {
            return false;
        };
        match running.get(kind.resource()) {
            Some(job) if job.kind == kind => {
                job.stop.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn stop_all(&self) {
        if let Ok(running) = self.running.lock() {
            for job in running.values() {
                job.stop.cancel();
            }
        }
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.running
            .lock()
            .map(|running| running.values().any(|job| job.kind == kind))
            .unwrap_or(false)
    }

    /// Finished runs, oldest first
    pub fn executions(&self) -> Vec<JobExecution> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}
