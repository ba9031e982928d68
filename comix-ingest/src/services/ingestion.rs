//! Library ingestion
//!
//! Registers new archives and drives every unfinished comic through the
//! pipeline: imported, fileDetailsCreated, fileContentsLoaded,
//! blockedPagesMarked, the page jobs, then contentsProcessed. A comic
//! that fails anywhere stays UNPROCESSED and is picked up again on the
//! next pass.

use super::file_scanner::{LibraryScanner, ScanError};
use crate::batch::{JobError, JobRequest, JobScheduler};
use crate::lifecycle::{LifecycleError, LifecycleMachine};
use crate::models::Comic;
use crate::store::ComicStore;
use chrono::Utc;
use comix_common::events::{ComicState, ComixEvent, EventBus, LifecycleEvent};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Comics prepared at once during a pass
const PREPARE_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Store(#[from] comix_common::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Counts from one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub scanned: usize,
    pub registered: usize,
    pub loaded: usize,
    pub stable: usize,
    pub pending: usize,
    pub failed: usize,
}

pub struct LibraryImporter {
    store: Arc<dyn ComicStore>,
    machine: Arc<LifecycleMachine>,
    scheduler: Arc<JobScheduler>,
    events: EventBus,
    scanner: LibraryScanner,
}

impl LibraryImporter {
    pub fn new(
        store: Arc<dyn ComicStore>,
        machine: Arc<LifecycleMachine>,
        scheduler: Arc<JobScheduler>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            machine,
            scheduler,
            events,
            scanner: LibraryScanner::new(),
        }
    }

    pub fn with_scanner(mut self, scanner: LibraryScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Register every archive under `root` not yet known, in ADDED
    ///
    /// Returns the ids of the new comics and the number of archives found.
    pub async fn register(&self, root: &Path) -> Result<(Vec<Uuid>, usize), IngestError> {
        let root = root.to_path_buf();
        let scanner = self.scanner.clone();
        let found = tokio::task::spawn_blocking(move || scanner.scan(&root))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))??;

        let mut registered = Vec::new();
        for archive in &found {
            if self.store.find_comic_by_path(&archive.path).await?.is_some() {
                continue;
            }

            let comic = Comic::new(&archive.path, archive.archive_type);
            self.store.save_comic(&comic).await?;
            info!(
                comic_id = %comic.id,
                path = %archive.path.display(),
                format = %archive.archive_type,
                "Comic registered"
            );
            self.events.emit_lossy(ComixEvent::ComicAdded {
                comic_id: comic.id,
                filename: archive.path.display().to_string(),
                timestamp: Utc::now(),
            });
            registered.push(comic.id);
        }

        Ok((registered, found.len()))
    }

    /// Bring one comic up to the point where its pages need hashing
    pub async fn prepare(&self, comic_id: Uuid) -> Result<ComicState, LifecycleError> {
        let Some(comic) = self.store.get_comic(comic_id).await? else {
            return Err(LifecycleError::ComicNotFound(comic_id));
        };

        let mut state = comic.state;
        if state == ComicState::Added {
            state = self.machine.fire(comic_id, LifecycleEvent::Imported).await?.state();
        }
        if state != ComicState::Unprocessed {
            return Ok(state);
        }

        self.machine.fire(comic_id, LifecycleEvent::FileDetailsCreated).await?;

        // After `imported` metadata_read is always false; a comic left
        // unprocessed by an earlier pass keeps its loaded pages.
        let loaded = self
            .store
            .get_comic(comic_id)
            .await?
            .is_some_and(|c| c.metadata_read);
        if !loaded {
            self.machine.fire(comic_id, LifecycleEvent::FileContentsLoaded).await?;
        }

        self.machine.fire(comic_id, LifecycleEvent::BlockedPagesMarked).await?;
        Ok(ComicState::Unprocessed)
    }

    /// Run one of the page jobs, treating a busy resource as nothing to do
    async fn run_job(&self, request: JobRequest) {
        match self.scheduler.run(request).await {
            Ok(report) => debug!(job = %report.job, written = report.written, "Job finished"),
            Err(JobError::AlreadyRunning(running)) => {
                debug!(running = %running, "Page records busy, job skipped")
            }
            Err(e) => warn!(error = %e, "Job failed"),
        }
    }

    /// One full pass over the library
    pub async fn run_once(&self, root: &Path) -> Result<IngestSummary, IngestError> {
        let (registered, scanned) = self.register(root).await?;
        let mut summary = IngestSummary {
            scanned,
            registered: registered.len(),
            ..Default::default()
        };

        let mut pending: Vec<Uuid> = self
            .store
            .find_comics_by_state(ComicState::Added)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        pending.extend(
            self.store
                .find_comics_by_state(ComicState::Unprocessed)
                .await?
                .into_iter()
                .map(|c| c.id),
        );

        // Comics are independent; events for one comic are serialized by the machine
        let outcomes: Vec<(Uuid, Result<ComicState, LifecycleError>)> = stream::iter(pending)
            .map(|comic_id| async move { (comic_id, self.prepare(comic_id).await) })
            .buffer_unordered(PREPARE_CONCURRENCY)
            .collect()
            .await;

        for (comic_id, outcome) in outcomes {
            match outcome {
                Ok(_) => summary.loaded += 1,
                Err(e) => {
                    warn!(comic_id = %comic_id, error = %e, "Comic preparation failed");
                    summary.failed += 1;
                }
            }
        }

        self.run_job(JobRequest::ComputeMissingHash).await;
        self.run_job(JobRequest::MarkBlockedPages).await;

        for comic in self.store.find_comics_by_state(ComicState::Unprocessed).await? {
            match self.machine.fire(comic.id, LifecycleEvent::ContentsProcessed).await {
                Ok(_) => summary.stable += 1,
                Err(LifecycleError::GuardViolation { reason, .. }) => {
                    debug!(comic_id = %comic.id, reason = %reason, "Comic not finished yet");
                    summary.pending += 1;
                }
                Err(e) => {
                    warn!(comic_id = %comic.id, error = %e, "Comic completion failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            scanned = summary.scanned,
            registered = summary.registered,
            stable = summary.stable,
            pending = summary.pending,
            failed = summary.failed,
            "Ingestion pass complete"
        );
        Ok(summary)
    }
}
