//! Store wrappers for failure scenarios

use async_trait::async_trait;
use comix_common::events::ComicState;
use comix_common::{Error, Result};
use comix_ingest::models::{BlockedHash, Comic, DeletedPageAndComic, DuplicatePage, Page, PageId, PageState};
use comix_ingest::store::{ComicStore, MemoryComicStore};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// In-memory store whose `save_comic` can be switched to fail
#[derive(Default)]
pub struct FailingSaveStore {
    inner: MemoryComicStore,
    fail_saves: AtomicBool,
}

impl FailingSaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ComicStore for FailingSaveStore {
    async fn get_comic(&self, id: Uuid) -> Result<Option<Comic>> {
        self.inner.get_comic(id).await
    }

    async fn save_comic(&self, comic: &Comic) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Internal("save_comic disabled".to_string()));
        }
        self.inner.save_comic(comic).await
    }

    async fn find_comic_by_path(&self, path: &Path) -> Result<Option<Comic>> {
        self.inner.find_comic_by_path(path).await
    }

    async fn find_comics_by_state(&self, state: ComicState) -> Result<Vec<Comic>> {
        self.inner.find_comics_by_state(state).await
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        self.inner.get_page(id).await
    }

    async fn save_pages(&self, pages: &[Page]) -> Result<()> {
        self.inner.save_pages(pages).await
    }

    async fn find_pages_without_hash(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        self.inner.find_pages_without_hash(after, limit).await
    }

    async fn count_pages_without_hash(&self) -> Result<u64> {
        self.inner.count_pages_without_hash().await
    }

    async fn find_pages_by_hash(
        &self,
        hash: &str,
        state: PageState,
        after: Option<PageId>,
        limit: usize,
    ) -> Result<Vec<Page>> {
        self.inner.find_pages_by_hash(hash, state, after, limit).await
    }

    async fn count_pages_by_hash(&self, hash: &str, state: PageState) -> Result<u64> {
        self.inner.count_pages_by_hash(hash, state).await
    }

    async fn find_unmarked_blocked_pages(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        self.inner.find_unmarked_blocked_pages(after, limit).await
    }

    async fn count_unmarked_blocked_pages(&self) -> Result<u64> {
        self.inner.count_unmarked_blocked_pages().await
    }

    async fn find_blocked_hashes(&self) -> Result<HashSet<String>> {
        self.inner.find_blocked_hashes().await
    }

    async fn get_blocked_hash(&self, hash: &str) -> Result<Option<BlockedHash>> {
        self.inner.get_blocked_hash(hash).await
    }

    async fn save_blocked_hash(&self, blocked: &BlockedHash) -> Result<()> {
        self.inner.save_blocked_hash(blocked).await
    }

    async fn delete_blocked_hash(&self, hash: &str) -> Result<bool> {
        self.inner.delete_blocked_hash(hash).await
    }

    async fn list_blocked_hashes(&self) -> Result<Vec<BlockedHash>> {
        self.inner.list_blocked_hashes().await
    }

    async fn find_duplicate_pages(&self) -> Result<Vec<DuplicatePage>> {
        self.inner.find_duplicate_pages().await
    }

    async fn find_deleted_pages(&self) -> Result<Vec<DeletedPageAndComic>> {
        self.inner.find_deleted_pages().await
    }
}
