//! Database Test Utilities

use anyhow::Result;
use comix_ingest::config::IngestSettings;
use comix_ingest::store::{ComicStore, MemoryComicStore, SqliteComicStore};
use comix_ingest::IngestContext;
use std::sync::Arc;
use tempfile::TempDir;

/// SQLite store in a temporary folder with the schema created
///
/// Returns (TempDir, store) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> Result<(TempDir, SqliteComicStore)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_comix.db");
    let pool = comix_common::db::init_database(&db_path).await?;
    Ok((temp_dir, SqliteComicStore::new(pool)))
}

/// Fully wired services over an in-memory store
pub fn create_test_context(chunk_size: usize, renumber_pages: bool) -> IngestContext {
    let store: Arc<dyn ComicStore> = Arc::new(MemoryComicStore::new());
    IngestContext::new(
        store,
        IngestSettings {
            chunk_size,
            renumber_pages,
            ..Default::default()
        },
    )
}
