//! Compute missing page hashes
//!
//! Reads each page's bytes straight from its comic's archive and stores
//! the SHA-256 of those bytes.

use super::job::ItemProcessor;
use super::ProcessError;
use crate::archive::{ArchiveLoader, ArchiveType};
use crate::models::Page;
use crate::services::hashing::content_hash;
use crate::store::ComicStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

type Location = (ArchiveType, PathBuf);

pub struct HashPageProcessor {
    store: Arc<dyn ComicStore>,
    loader: ArchiveLoader,
    /// Archive location per comic, filled on first use within a run
    locations: Mutex<HashMap<Uuid, Location>>,
}

impl HashPageProcessor {
    pub fn new(store: Arc<dyn ComicStore>, loader: ArchiveLoader) -> Self {
        Self {
            store,
            loader,
            locations: Mutex::new(HashMap::new()),
        }
    }

    async fn location(&self, comic_id: Uuid) -> Result<Location, ProcessError> {
        let mut locations = self.locations.lock().await;
        if let Some(location) = locations.get(&comic_id) {
            return Ok(location.clone());
        }

        let comic = self
            .store
            .get_comic(comic_id)
            .await?
            .ok_or(ProcessError::ComicNotFound(comic_id))?;
        let location = (comic.archive_type, comic.filename);
        locations.insert(comic_id, location.clone());
        Ok(location)
    }
}

#[async_trait]
impl ItemProcessor for HashPageProcessor {
    async fn process(&self, mut page: Page) -> Result<Option<Page>, ProcessError> {
        if page.has_hash() {
            return Ok(None);
        }

        let (archive_type, path) = self.location(page.comic_id).await?;
        let loader = self.loader.clone();
        let entry = page.filename.clone();

        let hash = tokio::task::spawn_blocking(move || {
            loader
                .load_one(archive_type, &path, &entry)
                .map(|bytes| content_hash(&bytes))
        })
        .await
        .map_err(|e| ProcessError::Task(e.to_string()))??;

        tracing::trace!(page_id = %page.id, hash = %hash, "Page hashed");
        page.hash = Some(hash);
        Ok(Some(page))
    }
}
