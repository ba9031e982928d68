//! Chunked batch jobs over page records
//!
//! Every job is a reader → processor → writer loop. The reader hands out
//! one page per call from a buffer refilled with one store fetch per
//! chunk; the processor computes or checks a value per page; the writer
//! persists the chunk as one atomic unit. Listeners observe chunk and job
//! boundaries.

pub mod hash_pages;
pub mod job;
pub mod listeners;
pub mod mark_pages;
pub mod reader;
pub mod scheduler;

pub use hash_pages::HashPageProcessor;
pub use job::{ChunkListener, ChunkedJob, ItemProcessor, ItemWriter, StorePageWriter};
pub use listeners::ProgressListener;
pub use mark_pages::{MarkForDeletionProcessor, UnmarkForDeletionProcessor};
pub use reader::{ChunkBuffer, PageQuery, PageReader, ReadOutcome};
pub use scheduler::{JobExecution, JobFactory, JobScheduler};

use crate::error::ArchiveError;
use crate::models::{PageId, PageStateError};
use chrono::{DateTime, Utc};
use comix_common::events::JobRunStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Job variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    ComputeMissingHash,
    MarkBlockedPages,
    MarkPagesByHash,
    UnmarkPagesByHash,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::ComputeMissingHash,
        JobKind::MarkBlockedPages,
        JobKind::MarkPagesByHash,
        JobKind::UnmarkPagesByHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ComputeMissingHash => "compute-missing-hash",
            JobKind::MarkBlockedPages => "mark-blocked-pages",
            JobKind::MarkPagesByHash => "mark-pages-by-hash",
            JobKind::UnmarkPagesByHash => "unmark-pages-by-hash",
        }
    }

    /// Resource the job holds exclusively while it runs
    ///
    /// All page jobs write page records, so they exclude each other.
    pub fn resource(&self) -> &'static str {
        "page-records"
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job to run, with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    ComputeMissingHash,
    MarkBlockedPages,
    MarkPagesByHash { hash: String },
    UnmarkPagesByHash { hash: String },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::ComputeMissingHash => JobKind::ComputeMissingHash,
            JobRequest::MarkBlockedPages => JobKind::MarkBlockedPages,
            JobRequest::MarkPagesByHash { .. } => JobKind::MarkPagesByHash,
            JobRequest::UnmarkPagesByHash { .. } => JobKind::UnmarkPagesByHash,
        }
    }
}

/// Failure that ends a job run
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job resource busy: {0} is running")]
    AlreadyRunning(JobKind),

    #[error("Invalid job parameter: {0}")]
    InvalidParameter(String),

    #[error("Reader failed: {0}")]
    Reader(#[source] comix_common::Error),

    /// The in-flight chunk was not committed
    #[error("Writer failed, chunk {chunk} not committed: {source}")]
    Writer {
        chunk: u64,
        #[source]
        source: comix_common::Error,
    },
}

/// Failure processing a single page; the chunk carries on without it
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Comic {0} not found")]
    ComicNotFound(Uuid),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    PageState(#[from] PageStateError),

    #[error(transparent)]
    Store(#[from] comix_common::Error),

    #[error("Processing task failed: {0}")]
    Task(String),
}

/// Record of a page that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFailure {
    pub page_id: PageId,
    pub comic_id: Uuid,
    pub reason: String,
}

/// Outcome of one job run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: JobKind,
    pub status: JobRunStatus,
    /// Pages handed out by the reader
    pub read: u64,
    /// Pages written back
    pub written: u64,
    /// Chunks committed
    pub chunks: u64,
    pub failures: Vec<ProcessFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
