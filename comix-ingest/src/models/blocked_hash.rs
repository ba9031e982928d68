//! Blocked hash model and report projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::page::{Page, PageState};

/// Operator-flagged page hash (ads, filler pages, scanner credits)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedHash {
    /// Unique within the blocked set
    pub hash: String,
    pub label: String,
    /// Illustrative page image, if the operator supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl BlockedHash {
    pub fn new(hash: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            label: label.into(),
            snapshot: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_snapshot(mut self, snapshot: Vec<u8>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// Hash shared by pages in more than one place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePage {
    pub hash: String,
    /// Pages carrying the hash
    pub page_count: u64,
    /// Comics containing at least one of those pages
    pub comic_ids: BTreeSet<Uuid>,
}

/// Hash of pages marked for deletion, with the comics containing them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPageAndComic {
    pub hash: String,
    pub comic_ids: BTreeSet<Uuid>,
}

/// Group pages by hash, keeping hashes seen on more than one page
pub fn duplicate_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Vec<DuplicatePage> {
    let mut by_hash: BTreeMap<&str, (u64, BTreeSet<Uuid>)> = BTreeMap::new();

    for page in pages {
        if page.state == PageState::Removed {
            continue;
        }
        if let Some(hash) = page.hash.as_deref() {
            let entry = by_hash.entry(hash).or_default();
            entry.0 += 1;
            entry.1.insert(page.comic_id);
        }
    }

    by_hash
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(hash, (page_count, comic_ids))| DuplicatePage {
            hash: hash.to_string(),
            page_count,
            comic_ids,
        })
        .collect()
}

/// Group pages marked for deletion by hash
pub fn deleted_pages<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Vec<DeletedPageAndComic> {
    let mut by_hash: BTreeMap<&str, BTreeSet<Uuid>> = BTreeMap::new();

    for page in pages.into_iter().filter(|p| p.is_marked_for_deletion()) {
        if let Some(hash) = page.hash.as_deref() {
            by_hash.entry(hash).or_default().insert(page.comic_id);
        }
    }

    by_hash
        .into_iter()
        .map(|(hash, comic_ids)| DeletedPageAndComic {
            hash: hash.to_string(),
            comic_ids,
        })
        .collect()
}
