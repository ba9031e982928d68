//! In-memory store

use super::ComicStore;
use crate::models::{
    deleted_pages, duplicate_pages, BlockedHash, Comic, DeletedPageAndComic, DuplicatePage, Page,
    PageId, PageState,
};
use async_trait::async_trait;
use comix_common::events::ComicState;
use comix_common::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    comics: HashMap<Uuid, Comic>,
    blocked: BTreeMap<String, BlockedHash>,
}

impl Inner {
    fn with_blocked_flags(&self, mut page: Page) -> Page {
        page.blocked = page
            .hash
            .as_deref()
            .is_some_and(|h| self.blocked.contains_key(h));
        page
    }

    fn comic_view(&self, comic: &Comic) -> Comic {
        let mut comic = comic.clone();
        for page in &mut comic.pages {
            page.blocked = page
                .hash
                .as_deref()
                .is_some_and(|h| self.blocked.contains_key(h));
        }
        comic
    }

    fn pages(&self) -> impl Iterator<Item = &Page> {
        self.comics.values().flat_map(|c| c.pages.iter())
    }

    /// Matching pages after the cursor, in id order
    fn page_window(
        &self,
        after: Option<PageId>,
        limit: usize,
        predicate: impl Fn(&Page) -> bool,
    ) -> Vec<Page> {
        let mut matching: Vec<&Page> = self
            .pages()
            .filter(|p| after.map_or(true, |a| p.id > a))
            .filter(|p| predicate(p))
            .collect();
        matching.sort_by_key(|p| p.id);

        matching
            .into_iter()
            .take(limit)
            .map(|p| self.with_blocked_flags(p.clone()))
            .collect()
    }

    fn is_unmarked_blocked(&self, page: &Page) -> bool {
        page.state == PageState::Stable
            && page
                .hash
                .as_deref()
                .is_some_and(|h| self.blocked.contains_key(h))
    }
}

/// Store backed by maps behind a `tokio::sync::RwLock`
#[derive(Default)]
pub struct MemoryComicStore {
    inner: RwLock<Inner>,
}

impl MemoryComicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComicStore for MemoryComicStore {
    async fn get_comic(&self, id: Uuid) -> Result<Option<Comic>> {
        let inner = self.inner.read().await;
        Ok(inner.comics.get(&id).map(|c| inner.comic_view(c)))
    }

    async fn save_comic(&self, comic: &Comic) -> Result<()> {
        let mut inner = self.inner.write().await;

        let path_taken = inner
            .comics
            .values()
            .any(|c| c.id != comic.id && c.filename == comic.filename);
        if path_taken {
            return Err(Error::InvalidInput(format!(
                "Another comic already uses {}",
                comic.filename.display()
            )));
        }

        inner.comics.insert(comic.id, comic.clone());
        Ok(())
    }

    async fn find_comic_by_path(&self, path: &Path) -> Result<Option<Comic>> {
        let inner = self.inner.read().await;
        Ok(inner
            .comics
            .values()
            .find(|c| c.filename == path)
            .map(|c| inner.comic_view(c)))
    }

    async fn find_comics_by_state(&self, state: ComicState) -> Result<Vec<Comic>> {
        let inner = self.inner.read().await;
        let mut comics: Vec<Comic> = inner
            .comics
            .values()
            .filter(|c| c.state == state)
            .map(|c| inner.comic_view(c))
            .collect();
        comics.sort_by_key(|c| c.added_at);
        Ok(comics)
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        let inner = self.inner.read().await;
        let page = inner
            .pages()
            .find(|p| p.id == id)
            .map(|p| inner.with_blocked_flags(p.clone()));
        Ok(page)
    }

    async fn save_pages(&self, pages: &[Page]) -> Result<()> {
        let mut inner = self.inner.write().await;

        // Locate every page before touching any
        let mut slots = Vec::with_capacity(pages.len());
        for page in pages {
            let index = inner
                .comics
                .get(&page.comic_id)
                .and_then(|c| c.pages.iter().position(|p| p.id == page.id))
                .ok_or_else(|| Error::NotFound(format!("Page {}", page.id)))?;
            slots.push(index);
        }

        for (page, index) in pages.iter().zip(slots) {
            if let Some(comic) = inner.comics.get_mut(&page.comic_id) {
                let mut stored = page.clone();
                stored.blocked = false;
                comic.pages[index] = stored;
            }
        }
        Ok(())
    }

    async fn find_pages_without_hash(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        let inner = self.inner.read().await;
        Ok(inner.page_window(after, limit, |p| !p.has_hash()))
    }

    async fn count_pages_without_hash(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.pages().filter(|p| !p.has_hash()).count() as u64)
    }

    async fn find_pages_by_hash(
        &self,
        hash: &str,
        state: PageState,
        after: Option<PageId>,
        limit: usize,
    ) -> Result<Vec<Page>> {
        let inner = self.inner.read().await;
        Ok(inner.page_window(after, limit, |p| {
            p.state == state && p.hash.as_deref() == Some(hash)
        }))
    }

    async fn count_pages_by_hash(&self, hash: &str, state: PageState) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .pages()
            .filter(|p| p.state == state && p.hash.as_deref() == Some(hash))
            .count() as u64)
    }

    async fn find_unmarked_blocked_pages(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        let inner = self.inner.read().await;
        Ok(inner.page_window(after, limit, |p| inner.is_unmarked_blocked(p)))
    }

    async fn count_unmarked_blocked_pages(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.pages().filter(|p| inner.is_unmarked_blocked(p)).count() as u64)
    }

    async fn find_blocked_hashes(&self) -> Result<HashSet<String>> {
        let inner = self.inner.read().await;
        Ok(inner.blocked.keys().cloned().collect())
    }

    async fn get_blocked_hash(&self, hash: &str) -> Result<Option<BlockedHash>> {
        let inner = self.inner.read().await;
        Ok(inner.blocked.get(hash).cloned())
    }

    async fn save_blocked_hash(&self, blocked: &BlockedHash) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.blocked.get_mut(&blocked.hash) {
            Some(existing) => {
                existing.label = blocked.label.clone();
                existing.snapshot = blocked.snapshot.clone();
            }
            None => {
                inner.blocked.insert(blocked.hash.clone(), blocked.clone());
            }
        }
        Ok(())
    }

    async fn delete_blocked_hash(&self, hash: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.blocked.remove(hash).is_some())
    }

    async fn list_blocked_hashes(&self) -> Result<Vec<BlockedHash>> {
        let inner = self.inner.read().await;
        Ok(inner.blocked.values().cloned().collect())
    }

    async fn find_duplicate_pages(&self) -> Result<Vec<DuplicatePage>> {
        let inner = self.inner.read().await;
        Ok(duplicate_pages(inner.pages()))
    }

    async fn find_deleted_pages(&self) -> Result<Vec<DeletedPageAndComic>> {
        let inner = self.inner.read().await;
        Ok(deleted_pages(inner.pages()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveType;

    fn comic_with_hashes(path: &str, hashes: &[Option<&str>]) -> Comic {
        let mut comic = Comic::new(path, ArchiveType::Zip);
        for (i, hash) in hashes.iter().enumerate() {
            let page = comic.push_page(format!("{:03}.jpg", i));
            page.hash = hash.map(str::to_string);
        }
        comic
    }

    #[tokio::test]
    async fn test_cursor_walks_every_page_once() {
        let store = MemoryComicStore::new();
        store
            .save_comic(&comic_with_hashes("/a.cbz", &[None, None, None, Some("x")]))
            .await
            .unwrap();
        store
            .save_comic(&comic_with_hashes("/b.cbz", &[None, None]))
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let window = store.find_pages_without_hash(after, 2).await.unwrap();
            if window.is_empty() {
                break;
            }
            after = window.last().map(|p| p.id);
            seen.extend(window.into_iter().map(|p| p.id));
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(store.count_pages_without_hash().await.unwrap(), 5);
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(seen, sorted);
    }

    #[tokio::test]
    async fn test_blocked_flag_is_derived() {
        let store = MemoryComicStore::new();
        let comic = comic_with_hashes("/a.cbz", &[Some("H1"), Some("H2")]);
        store.save_comic(&comic).await.unwrap();
        store.save_blocked_hash(&BlockedHash::new("H1", "ad")).await.unwrap();

        let loaded = store.get_comic(comic.id).await.unwrap().unwrap();
        assert!(loaded.pages[0].blocked);
        assert!(!loaded.pages[1].blocked);
        let page = store.get_page(comic.pages[0].id).await.unwrap().unwrap();
        assert!(page.blocked);

        store.delete_blocked_hash("H1").await.unwrap();
        let loaded = store.get_comic(comic.id).await.unwrap().unwrap();
        assert!(!loaded.pages[0].blocked);
        let page = store.get_page(comic.pages[0].id).await.unwrap().unwrap();
        assert!(!page.blocked);
        assert!(store.get_page(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_pages_is_all_or_nothing() {
        let store = MemoryComicStore::new();
        let comic = comic_with_hashes("/a.cbz", &[None]);
        store.save_comic(&comic).await.unwrap();

        let mut known = comic.pages[0].clone();
        known.hash = Some("abc".to_string());
        let stranger = Page::new(comic.id, 9, "ghost.jpg");

        let result = store.save_pages(&[known, stranger]).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(store.count_pages_without_hash().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resaving_blocked_hash_updates_label() {
        let store = MemoryComicStore::new();
        store.save_blocked_hash(&BlockedHash::new("H1", "first")).await.unwrap();
        store
            .save_blocked_hash(&BlockedHash::new("H1", "second").with_snapshot(vec![1]))
            .await
            .unwrap();

        let all = store.list_blocked_hashes().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].label, "second");
        assert_eq!(all[0].snapshot, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_path_is_unique() {
        let store = MemoryComicStore::new();
        store.save_comic(&Comic::new("/a.cbz", ArchiveType::Zip)).await.unwrap();

        let result = store.save_comic(&Comic::new("/a.cbz", ArchiveType::Zip)).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
