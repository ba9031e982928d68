//! Comic model
//!
//! One archive on disk and the pages extracted from it.

use super::comic_info::MetadataDocument;
use super::page::{Page, PageState, PageStateError};
use crate::archive::ArchiveType;
use chrono::{DateTime, Utc};
use comix_common::events::ComicState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Details of the archive file itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    /// SHA-256 of the whole archive file
    pub hash: String,
    /// Archive size in bytes
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Comic record
///
/// Owns its pages. Pages are kept ordered by page number, which runs
/// contiguously from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comic {
    pub id: Uuid,
    /// Archive path on disk
    pub filename: PathBuf,
    pub archive_type: ArchiveType,
    pub state: ComicState,
    pub pages: Vec<Page>,
    /// Metadata document, when the archive carries one
    pub metadata: Option<MetadataDocument>,
    /// Set once the archive entries have been scanned for a metadata document
    pub metadata_read: bool,
    pub file_details: Option<FileDetails>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comic {
    /// Register a new comic for an archive path
    pub fn new(filename: impl Into<PathBuf>, archive_type: ArchiveType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            archive_type,
            state: ComicState::Added,
            pages: Vec::new(),
            metadata: None,
            metadata_read: false,
            file_details: None,
            added_at: now,
            updated_at: now,
        }
    }

    pub fn path(&self) -> &Path {
        &self.filename
    }

    /// Append a page after the current last page
    pub fn push_page(&mut self, filename: impl Into<String>) -> &mut Page {
        let page_number = self.pages.len() as u32;
        self.pages.push(Page::new(self.id, page_number, filename));
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Drop every page and the metadata document ahead of a fresh load
    pub fn clear_contents(&mut self) {
        self.pages.clear();
        self.metadata = None;
        self.metadata_read = false;
    }

    /// Page numbers run 0..n in vector order
    pub fn has_contiguous_pages(&self) -> bool {
        self.pages
            .iter()
            .enumerate()
            .all(|(index, page)| page.page_number as usize == index)
    }

    pub fn unhashed_page_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.has_hash()).count()
    }

    pub fn all_pages_hashed(&self) -> bool {
        self.unhashed_page_count() == 0
    }

    pub fn pages_marked_for_deletion(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.is_marked_for_deletion())
    }

    /// Move marked pages to removed, drop them, and renumber the rest
    ///
    /// Returns the removed pages.
    pub fn remove_marked_pages(&mut self) -> Result<Vec<Page>, PageStateError> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.pages.len());

        for mut page in self.pages.drain(..) {
            if page.state == PageState::MarkedForDeletion {
                page.remove()?;
                removed.push(page);
            } else {
                kept.push(page);
            }
        }

        for (index, page) in kept.iter_mut().enumerate() {
            page.page_number = index as u32;
        }
        self.pages = kept;

        Ok(removed)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comic_with_pages(n: usize) -> Comic {
        let mut comic = Comic::new("/comics/a.cbz", ArchiveType::Zip);
        for i in 0..n {
            comic.push_page(format!("{:03}.jpg", i));
        }
        comic
    }

    #[test]
    fn test_new_comic_is_added() {
        let comic = Comic::new("/comics/a.cbz", ArchiveType::Zip);
        assert_eq!(comic.state, ComicState::Added);
        assert!(comic.pages.is_empty());
        assert!(!comic.metadata_read);
    }

    #[test]
    fn test_push_page_numbers_sequentially() {
        let comic = comic_with_pages(3);
        assert!(comic.has_contiguous_pages());
        assert_eq!(comic.pages[2].page_number, 2);
        assert!(comic.pages.iter().all(|p| p.comic_id == comic.id));
    }

    #[test]
    fn test_all_pages_hashed() {
        let mut comic = comic_with_pages(2);
        assert_eq!(comic.unhashed_page_count(), 2);

        comic.pages[0].hash = Some("abc".to_string());
        assert!(!comic.all_pages_hashed());

        comic.pages[1].hash = Some("def".to_string());
        assert!(comic.all_pages_hashed());
    }

    #[test]
    fn test_remove_marked_pages_renumbers() {
        let mut comic = comic_with_pages(4);
        comic.pages[1].mark_for_deletion().unwrap();

        let removed = comic.remove_marked_pages().unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].filename, "001.jpg");
        assert_eq!(removed[0].state, PageState::Removed);
        assert_eq!(comic.pages.len(), 3);
        assert!(comic.has_contiguous_pages());
        assert_eq!(comic.pages[1].filename, "002.jpg");
    }
}
