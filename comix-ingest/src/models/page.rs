//! Page model
//!
//! One entry extracted from a comic archive.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Page identifier
///
/// Store queries page through records in identifier order.
pub type PageId = Uuid;

/// Page processing flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageState {
    Stable,
    MarkedForDeletion,
    /// Terminal: the page left the archive and is never observed again
    Removed,
}

impl PageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageState::Stable => "STABLE",
            PageState::MarkedForDeletion => "MARKED_FOR_DELETION",
            PageState::Removed => "REMOVED",
        }
    }

    /// Allowed moves: stable ⇄ marked-for-deletion → removed
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (PageState::Stable, PageState::MarkedForDeletion)
                | (PageState::MarkedForDeletion, PageState::Stable)
                | (PageState::MarkedForDeletion, PageState::Removed)
        )
    }
}

impl std::fmt::Display for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STABLE" => Ok(PageState::Stable),
            "MARKED_FOR_DELETION" => Ok(PageState::MarkedForDeletion),
            "REMOVED" => Ok(PageState::Removed),
            other => Err(format!("Unknown page state: {}", other)),
        }
    }
}

/// Illegal page state change
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Page {page_id} cannot move from {from} to {to}")]
pub struct PageStateError {
    pub page_id: PageId,
    pub from: PageState,
    pub to: PageState,
}

/// Page record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    /// Owning comic (back-reference)
    pub comic_id: Uuid,
    /// Zero-based position within the comic
    pub page_number: u32,
    /// Entry name inside the archive
    pub filename: String,
    /// Content hash, None until computed
    pub hash: Option<String>,
    pub width: i32,
    pub height: i32,
    pub state: PageState,
    /// Hash is in the blocked set. Derived on read, never persisted.
    #[serde(skip)]
    pub blocked: bool,
}

impl Page {
    /// Sentinel for an unknown width or height
    pub const UNKNOWN_DIMENSION: i32 = -1;

    pub fn new(comic_id: Uuid, page_number: u32, filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            comic_id,
            page_number,
            filename: filename.into(),
            hash: None,
            width: Self::UNKNOWN_DIMENSION,
            height: Self::UNKNOWN_DIMENSION,
            state: PageState::Stable,
            blocked: false,
        }
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.state == PageState::MarkedForDeletion
    }

    pub fn has_hash(&self) -> bool {
        self.hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Mark for deletion; returns false when already marked
    pub fn mark_for_deletion(&mut self) -> Result<bool, PageStateError> {
        if self.state == PageState::MarkedForDeletion {
            return Ok(false);
        }
        self.transition(PageState::MarkedForDeletion)?;
        Ok(true)
    }

    /// Clear the deletion mark; returns false when not marked
    pub fn unmark_for_deletion(&mut self) -> Result<bool, PageStateError> {
        if self.state == PageState::Stable {
            return Ok(false);
        }
        self.transition(PageState::Stable)?;
        Ok(true)
    }

    /// Final step once the page has been left out of a recreated archive
    pub fn remove(&mut self) -> Result<(), PageStateError> {
        self.transition(PageState::Removed)
    }

    fn transition(&mut self, next: PageState) -> Result<(), PageStateError> {
        if !self.state.can_transition_to(next) {
            return Err(PageStateError {
                page_id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
