//! Comic lifecycle type definitions
//!
//! States a comic passes through and the events that move it between them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Comic lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComicState {
    /// Registered from a path, nothing read yet
    Added,
    /// Archive contents being ingested and hashed
    Unprocessed,
    /// Fully processed, matches its archive
    Stable,
    /// Edited since it was last stable
    Changed,
    /// Marked for removal
    Deleted,
    /// Purged; terminal
    Removed,
}

impl ComicState {
    /// Every state, in lifecycle order
    pub const ALL: [ComicState; 6] = [
        ComicState::Added,
        ComicState::Unprocessed,
        ComicState::Stable,
        ComicState::Changed,
        ComicState::Deleted,
        ComicState::Removed,
    ];

    /// Stable string form used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ComicState::Added => "ADDED",
            ComicState::Unprocessed => "UNPROCESSED",
            ComicState::Stable => "STABLE",
            ComicState::Changed => "CHANGED",
            ComicState::Deleted => "DELETED",
            ComicState::Removed => "REMOVED",
        }
    }

    /// No event may leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComicState::Removed)
    }
}

impl std::fmt::Display for ComicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComicState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComicState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown comic state: {}", s))
    }
}

/// Event that drives a comic lifecycle transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    Imported,
    FileContentsLoaded,
    BlockedPagesMarked,
    FileDetailsCreated,
    ContentsProcessed,
    ArchiveRecreated,
    ComicMoved,
    DetailsUpdated,
    Scraped,
    MetadataCleared,
    ComicInfoUpdated,
    MarkedForRemoval,
    UnmarkedForRemoval,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 13] = [
        LifecycleEvent::Imported,
        LifecycleEvent::FileContentsLoaded,
        LifecycleEvent::BlockedPagesMarked,
        LifecycleEvent::FileDetailsCreated,
        LifecycleEvent::ContentsProcessed,
        LifecycleEvent::ArchiveRecreated,
        LifecycleEvent::ComicMoved,
        LifecycleEvent::DetailsUpdated,
        LifecycleEvent::Scraped,
        LifecycleEvent::MetadataCleared,
        LifecycleEvent::ComicInfoUpdated,
        LifecycleEvent::MarkedForRemoval,
        LifecycleEvent::UnmarkedForRemoval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Imported => "imported",
            LifecycleEvent::FileContentsLoaded => "fileContentsLoaded",
            LifecycleEvent::BlockedPagesMarked => "blockedPagesMarked",
            LifecycleEvent::FileDetailsCreated => "fileDetailsCreated",
            LifecycleEvent::ContentsProcessed => "contentsProcessed",
            LifecycleEvent::ArchiveRecreated => "archiveRecreated",
            LifecycleEvent::ComicMoved => "comicMoved",
            LifecycleEvent::DetailsUpdated => "detailsUpdated",
            LifecycleEvent::Scraped => "scraped",
            LifecycleEvent::MetadataCleared => "metadataCleared",
            LifecycleEvent::ComicInfoUpdated => "comicInfoUpdated",
            LifecycleEvent::MarkedForRemoval => "markedForRemoval",
            LifecycleEvent::UnmarkedForRemoval => "unmarkedForRemoval",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
