//! Chunked page reader
//!
//! The buffer starts empty. When it runs dry the reader makes exactly one
//! store fetch of up to `chunk_size` pages. A fetch that returns nothing
//! ends the data for the rest of the run: the store is never queried
//! again, so pages added after that point wait for the next run.

use crate::models::{Page, PageId, PageState};
use crate::store::ComicStore;
use comix_common::Result;
use std::collections::VecDeque;
use std::sync::Arc;

/// One read from a reader
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Item(T),
    EndOfData,
}

/// Buffer state owned by one reader instance
#[derive(Debug)]
pub struct ChunkBuffer<T> {
    buffer: VecDeque<T>,
    exhausted: bool,
    fetches: usize,
}

impl<T> Default for ChunkBuffer<T> {
    fn default() -> Self {
        Self {
            buffer: VecDeque::new(),
            exhausted: false,
            fetches: 0,
        }
    }
}

impl<T> ChunkBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer is empty and the source may still hold items
    pub fn needs_fetch(&self) -> bool {
        self.buffer.is_empty() && !self.exhausted
    }

    /// Record a fetch result; an empty fetch exhausts the buffer for good
    pub fn refill(&mut self, items: Vec<T>) {
        self.fetches += 1;
        if items.is_empty() {
            self.exhausted = true;
        }
        self.buffer.extend(items);
    }

    pub fn next(&mut self) -> ReadOutcome<T> {
        match self.buffer.pop_front() {
            Some(item) => ReadOutcome::Item(item),
            None => ReadOutcome::EndOfData,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Store fetches made so far
    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

/// Page selection for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageQuery {
    /// Pages with no content hash
    WithoutHash,
    /// Stable pages whose hash is in the blocked set
    UnmarkedBlocked,
    /// Pages with the target hash in the given state
    ByHash { hash: String, state: PageState },
}

/// Reader shared by all page jobs
pub struct PageReader {
    store: Arc<dyn ComicStore>,
    query: PageQuery,
    chunk_size: usize,
    buffer: ChunkBuffer<Page>,
    cursor: Option<PageId>,
}

impl PageReader {
    pub fn new(store: Arc<dyn ComicStore>, query: PageQuery, chunk_size: usize) -> Self {
        Self {
            store,
            query,
            chunk_size: chunk_size.max(1),
            buffer: ChunkBuffer::new(),
            cursor: None,
        }
    }

    pub fn query(&self) -> &PageQuery {
        &self.query
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn fetches(&self) -> usize {
        self.buffer.fetches()
    }

    /// Pages pending when asked; used as the progress total
    pub async fn pending(&self) -> Result<u64> {
        match &self.query {
            PageQuery::WithoutHash => self.store.count_pages_without_hash().await,
            PageQuery::UnmarkedBlocked => self.store.count_unmarked_blocked_pages().await,
            PageQuery::ByHash { hash, state } => self.store.count_pages_by_hash(hash, *state).await,
        }
    }

    pub async fn read(&mut self) -> Result<ReadOutcome<Page>> {
        if self.buffer.needs_fetch() {
            let pages = self.fetch().await?;
            if let Some(last) = pages.last() {
                self.cursor = Some(last.id);
            }
            self.buffer.refill(pages);
        }
        Ok(self.buffer.next())
    }

    async fn fetch(&self) -> Result<Vec<Page>> {
        let after = self.cursor;
        let limit = self.chunk_size;

        match &self.query {
            PageQuery::WithoutHash => self.store.find_pages_without_hash(after, limit).await,
            PageQuery::UnmarkedBlocked => self.store.find_unmarked_blocked_pages(after, limit).await,
            PageQuery::ByHash { hash, state } => {
                self.store.find_pages_by_hash(hash, *state, after, limit).await
            }
        }
    }
}
