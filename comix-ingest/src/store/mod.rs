//! Comic and page store
//!
//! The contract the ingest core needs from persistence. Page queries are
//! keyset-paginated in page-id order: `after` is the last id the caller
//! has seen, `None` starts from the beginning.
//!
//! Pages returned by any query carry the derived `blocked` flag.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryComicStore;
pub use sqlite::SqliteComicStore;

use crate::models::{BlockedHash, Comic, DeletedPageAndComic, DuplicatePage, Page, PageId, PageState};
use async_trait::async_trait;
use comix_common::events::ComicState;
use comix_common::Result;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

#[async_trait]
pub trait ComicStore: Send + Sync {
    async fn get_comic(&self, id: Uuid) -> Result<Option<Comic>>;

    /// Insert or replace a comic together with its full page set
    ///
    /// Atomic: either the comic and every page are stored or nothing is.
    async fn save_comic(&self, comic: &Comic) -> Result<()>;

    async fn find_comic_by_path(&self, path: &Path) -> Result<Option<Comic>>;

    async fn find_comics_by_state(&self, state: ComicState) -> Result<Vec<Comic>>;

    async fn get_page(&self, id: PageId) -> Result<Option<Page>>;

    /// Update existing pages in one atomic unit
    ///
    /// Fails with `NotFound` without writing anything when a page is
    /// unknown to the store.
    async fn save_pages(&self, pages: &[Page]) -> Result<()>;

    async fn find_pages_without_hash(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>>;

    async fn count_pages_without_hash(&self) -> Result<u64>;

    async fn find_pages_by_hash(
        &self,
        hash: &str,
        state: PageState,
        after: Option<PageId>,
        limit: usize,
    ) -> Result<Vec<Page>>;

    async fn count_pages_by_hash(&self, hash: &str, state: PageState) -> Result<u64>;

    /// Stable pages whose hash is in the blocked set
    async fn find_unmarked_blocked_pages(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>>;

    async fn count_unmarked_blocked_pages(&self) -> Result<u64>;

    async fn find_blocked_hashes(&self) -> Result<HashSet<String>>;

    async fn get_blocked_hash(&self, hash: &str) -> Result<Option<BlockedHash>>;

    /// Add a blocked hash, or update label and snapshot of an existing one
    async fn save_blocked_hash(&self, blocked: &BlockedHash) -> Result<()>;

    /// Returns false when the hash was not blocked
    async fn delete_blocked_hash(&self, hash: &str) -> Result<bool>;

    /// All blocked hashes, ordered by hash
    async fn list_blocked_hashes(&self) -> Result<Vec<BlockedHash>>;

    async fn find_duplicate_pages(&self) -> Result<Vec<DuplicatePage>>;

    async fn find_deleted_pages(&self) -> Result<Vec<DeletedPageAndComic>>;
}
