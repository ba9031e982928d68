//! Error types for comix-ingest
//!
//! Archive-level failures always carry the archive path (and entry name
//! where one applies) together with the underlying cause.

use crate::models::{ComicInfoError, PageStateError};
use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause from a codec library or the filesystem
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Archive adaptor error
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Path missing, a directory, or not a well-formed container
    #[error("Cannot open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Entry could not be read (including a name the archive does not hold)
    #[error("Cannot read entry '{entry}' from {}: {source}", path.display())]
    EntryRead {
        path: PathBuf,
        entry: String,
        #[source]
        source: BoxError,
    },

    /// New archive could not be produced or published
    #[error("Cannot write archive {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// No adaptor handles this container
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),
}

impl ArchiveError {
    pub fn open(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        ArchiveError::Open {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn entry_read(
        path: impl Into<PathBuf>,
        entry: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        ArchiveError::EntryRead {
            path: path.into(),
            entry: entry.into(),
            source: source.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        ArchiveError::Write {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Entry name absent from the archive
    pub fn entry_not_found(path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        let source = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no entry named '{}'", entry),
        );
        Self::entry_read(path, entry, source)
    }
}

/// Per-entry loader failure
///
/// Logged and skipped by the full-archive load; never aborts a comic.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Metadata document '{entry}' rejected: {source}")]
    Metadata {
        entry: String,
        #[source]
        source: ComicInfoError,
    },

    #[error("Entry '{entry}' rejected: {reason}")]
    Invalid { entry: String, reason: String },
}

/// Failure recreating a comic's archive in place
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    PageState(#[from] PageStateError),
}
