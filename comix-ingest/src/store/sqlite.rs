//! SQLite store
//!
//! Tables come from `comix_common::db::create_schema`. Ids are stored as
//! hyphenated UUID text and timestamps as RFC 3339 text, so ordering by
//! `id` matches `Uuid` ordering.

use super::ComicStore;
use crate::archive::ArchiveType;
use crate::models::{
    BlockedHash, Comic, ComicInfo, DeletedPageAndComic, DuplicatePage, FileDetails,
    MetadataDocument, Page, PageId, PageState,
};
use crate::utils::retry_on_lock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use comix_common::events::ComicState;
use comix_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default time to keep retrying a locked database
pub const DEFAULT_LOCK_WAIT_MS: u64 = 5000;

const PAGE_COLUMNS: &str = r#"
    p.id, p.comic_id, p.page_number, p.filename, p.hash, p.width, p.height, p.state,
    EXISTS (SELECT 1 FROM blocked_hashes b WHERE b.hash = p.hash) AS blocked
"#;

const COMIC_COLUMNS: &str = r#"
    id, filename, archive_type, state, metadata_read, metadata_entry, metadata_raw,
    metadata_json, file_hash, file_size, file_details_created_at, added_at, updated_at
"#;

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Bad id '{}': {}", value, e)))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Bad timestamp '{}': {}", value, e)))
}

fn page_from_row(row: &SqliteRow) -> Result<Page> {
    let id: String = row.get("id");
    let comic_id: String = row.get("comic_id");
    let page_number: i64 = row.get("page_number");
    let state: String = row.get("state");

    Ok(Page {
        id: parse_uuid(&id)?,
        comic_id: parse_uuid(&comic_id)?,
        page_number: u32::try_from(page_number)
            .map_err(|_| Error::Internal(format!("Bad page number {}", page_number)))?,
        filename: row.get("filename"),
        hash: row.get("hash"),
        width: row.get("width"),
        height: row.get("height"),
        state: state.parse().map_err(Error::Internal)?,
        blocked: row.get::<i64, _>("blocked") != 0,
    })
}

fn comic_from_row(row: &SqliteRow, pages: Vec<Page>) -> Result<Comic> {
    let id: String = row.get("id");
    let filename: String = row.get("filename");
    let archive_type: String = row.get("archive_type");
    let state: String = row.get("state");
    let added_at: String = row.get("added_at");
    let updated_at: String = row.get("updated_at");

    let metadata_entry: Option<String> = row.get("metadata_entry");
    let metadata = match metadata_entry {
        Some(entry_name) => {
            let raw: Option<Vec<u8>> = row.get("metadata_raw");
            let json: Option<String> = row.get("metadata_json");
            let info: ComicInfo = match json {
                Some(json) => serde_json::from_str(&json)
                    .map_err(|e| Error::Internal(format!("Bad metadata for comic {}: {}", id, e)))?,
                None => ComicInfo::default(),
            };
            Some(MetadataDocument {
                entry_name,
                raw: raw.unwrap_or_default(),
                info,
            })
        }
        None => None,
    };

    let file_hash: Option<String> = row.get("file_hash");
    let file_details = match file_hash {
        Some(hash) => {
            let size: i64 = row.get("file_size");
            let created_at: String = row.get("file_details_created_at");
            Some(FileDetails {
                hash,
                size: size.max(0) as u64,
                created_at: parse_time(&created_at)?,
            })
        }
        None => None,
    };

    Ok(Comic {
        id: parse_uuid(&id)?,
        filename: PathBuf::from(filename),
        archive_type: archive_type.parse::<ArchiveType>().map_err(Error::Internal)?,
        state: state.parse::<ComicState>().map_err(Error::Internal)?,
        pages,
        metadata,
        metadata_read: row.get::<i64, _>("metadata_read") != 0,
        file_details,
        added_at: parse_time(&added_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn id_set(joined: Option<String>) -> Result<BTreeSet<Uuid>> {
    joined
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(parse_uuid)
        .collect()
}

/// Store over a `sqlx` SQLite pool
#[derive(Clone)]
pub struct SqliteComicStore {
    pool: SqlitePool,
    lock_wait_ms: u64,
}

impl SqliteComicStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lock_wait_ms: DEFAULT_LOCK_WAIT_MS,
        }
    }

    pub fn with_lock_wait(mut self, lock_wait_ms: u64) -> Self {
        self.lock_wait_ms = lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_pages(&self, comic_id: &str) -> Result<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM pages p WHERE p.comic_id = ? ORDER BY p.page_number",
            PAGE_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(comic_id).fetch_all(&self.pool).await?;
        rows.iter().map(page_from_row).collect()
    }

    async fn comic_with_pages(&self, row: &SqliteRow) -> Result<Comic> {
        let id: String = row.get("id");
        let pages = self.load_pages(&id).await?;
        comic_from_row(row, pages)
    }

    /// Page window after the cursor for a WHERE fragment with `?` binds
    async fn page_window(
        &self,
        condition: &str,
        binds: &[&str],
        after: Option<PageId>,
        limit: usize,
    ) -> Result<Vec<Page>> {
        let sql = format!(
            "SELECT {} FROM pages p WHERE ({}) AND (? IS NULL OR p.id > ?) ORDER BY p.id LIMIT ?",
            PAGE_COLUMNS, condition
        );
        let after = after.map(|id| id.to_string());

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let rows = query
            .bind(after.clone())
            .bind(after)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(page_from_row).collect()
    }

    async fn count_where(&self, condition: &str, binds: &[&str]) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM pages p WHERE {}", condition);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn save_comic_once(&self, comic: &Comic) -> Result<()> {
        let id = comic.id.to_string();
        let metadata_json = match &comic.metadata {
            Some(document) => Some(
                serde_json::to_string(&document.info)
                    .map_err(|e| Error::Internal(format!("Cannot encode metadata: {}", e)))?,
            ),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO comics (id, filename, archive_type, state, metadata_read, metadata_entry,
                                metadata_raw, metadata_json, file_hash, file_size,
                                file_details_created_at, added_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                archive_type = excluded.archive_type,
                state = excluded.state,
                metadata_read = excluded.metadata_read,
                metadata_entry = excluded.metadata_entry,
                metadata_raw = excluded.metadata_raw,
                metadata_json = excluded.metadata_json,
                file_hash = excluded.file_hash,
                file_size = excluded.file_size,
                file_details_created_at = excluded.file_details_created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(comic.filename.to_string_lossy().into_owned())
        .bind(comic.archive_type.as_str())
        .bind(comic.state.as_str())
        .bind(comic.metadata_read)
        .bind(comic.metadata.as_ref().map(|m| m.entry_name.clone()))
        .bind(comic.metadata.as_ref().map(|m| m.raw.clone()))
        .bind(metadata_json)
        .bind(comic.file_details.as_ref().map(|d| d.hash.clone()))
        .bind(comic.file_details.as_ref().map(|d| d.size as i64))
        .bind(comic.file_details.as_ref().map(|d| d.created_at.to_rfc3339()))
        .bind(comic.added_at.to_rfc3339())
        .bind(comic.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM pages WHERE comic_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        for page in &comic.pages {
            sqlx::query(
                r#"
                INSERT INTO pages (id, comic_id, page_number, filename, hash, width, height, state)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(page.id.to_string())
            .bind(&id)
            .bind(page.page_number as i64)
            .bind(&page.filename)
            .bind(&page.hash)
            .bind(page.width)
            .bind(page.height)
            .bind(page.state.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_pages_once(&self, pages: &[Page]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for page in pages {
            let result = sqlx::query(
                r#"
                UPDATE pages
                SET page_number = ?, filename = ?, hash = ?, width = ?, height = ?, state = ?
                WHERE id = ?
                "#,
            )
            .bind(page.page_number as i64)
            .bind(&page.filename)
            .bind(&page.hash)
            .bind(page.width)
            .bind(page.height)
            .bind(page.state.as_str())
            .bind(page.id.to_string())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier updates
                return Err(Error::NotFound(format!("Page {}", page.id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ComicStore for SqliteComicStore {
    async fn get_comic(&self, id: Uuid) -> Result<Option<Comic>> {
        let sql = format!("SELECT {} FROM comics WHERE id = ?", COMIC_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.comic_with_pages(&row).await?)),
            None => Ok(None),
        }
    }

    async fn save_comic(&self, comic: &Comic) -> Result<()> {
        retry_on_lock("save comic", self.lock_wait_ms, || self.save_comic_once(comic)).await
    }

    async fn find_comic_by_path(&self, path: &Path) -> Result<Option<Comic>> {
        let sql = format!("SELECT {} FROM comics WHERE filename = ?", COMIC_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(path.to_string_lossy().into_owned())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.comic_with_pages(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_comics_by_state(&self, state: ComicState) -> Result<Vec<Comic>> {
        let sql = format!(
            "SELECT {} FROM comics WHERE state = ? ORDER BY added_at",
            COMIC_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut comics = Vec::with_capacity(rows.len());
        for row in &rows {
            comics.push(self.comic_with_pages(row).await?);
        }
        Ok(comics)
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        let sql = format!("SELECT {} FROM pages p WHERE p.id = ?", PAGE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn save_pages(&self, pages: &[Page]) -> Result<()> {
        retry_on_lock("save pages", self.lock_wait_ms, || self.save_pages_once(pages)).await
    }

    async fn find_pages_without_hash(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        self.page_window("p.hash IS NULL OR p.hash = ''", &[], after, limit)
            .await
    }

    async fn count_pages_without_hash(&self) -> Result<u64> {
        self.count_where("p.hash IS NULL OR p.hash = ''", &[]).await
    }

    async fn find_pages_by_hash(
        &self,
        hash: &str,
        state: PageState,
        after: Option<PageId>,
        limit: usize,
    ) -> Result<Vec<Page>> {
        self.page_window("p.hash = ? AND p.state = ?", &[hash, state.as_str()], after, limit)
            .await
    }

    async fn count_pages_by_hash(&self, hash: &str, state: PageState) -> Result<u64> {
        self.count_where("p.hash = ? AND p.state = ?", &[hash, state.as_str()])
            .await
    }

    async fn find_unmarked_blocked_pages(&self, after: Option<PageId>, limit: usize) -> Result<Vec<Page>> {
        self.page_window(
            "p.state = ? AND p.hash IN (SELECT hash FROM blocked_hashes)",
            &[PageState::Stable.as_str()],
            after,
            limit,
        )
        .await
    }

    async fn count_unmarked_blocked_pages(&self) -> Result<u64> {
        self.count_where(
            "p.state = ? AND p.hash IN (SELECT hash FROM blocked_hashes)",
            &[PageState::Stable.as_str()],
        )
        .await
    }

    async fn find_blocked_hashes(&self) -> Result<HashSet<String>> {
        let hashes: Vec<String> = sqlx::query_scalar("SELECT hash FROM blocked_hashes")
            .fetch_all(&self.pool)
            .await?;
        Ok(hashes.into_iter().collect())
    }

    async fn get_blocked_hash(&self, hash: &str) -> Result<Option<BlockedHash>> {
        let row = sqlx::query(
            "SELECT hash, label, snapshot, created_at FROM blocked_hashes WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let created_at: String = row.get("created_at");
                Ok(Some(BlockedHash {
                    hash: row.get("hash"),
                    label: row.get("label"),
                    snapshot: row.get("snapshot"),
                    created_at: parse_time(&created_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save_blocked_hash(&self, blocked: &BlockedHash) -> Result<()> {
        retry_on_lock("save blocked hash", self.lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO blocked_hashes (hash, label, snapshot, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(hash) DO UPDATE SET
                    label = excluded.label,
                    snapshot = excluded.snapshot
                "#,
            )
            .bind(&blocked.hash)
            .bind(&blocked.label)
            .bind(&blocked.snapshot)
            .bind(blocked.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok::<(), Error>(())
        })
        .await
    }

    async fn delete_blocked_hash(&self, hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_hashes WHERE hash = ?")
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_blocked_hashes(&self) -> Result<Vec<BlockedHash>> {
        let rows = sqlx::query(
            "SELECT hash, label, snapshot, created_at FROM blocked_hashes ORDER BY hash",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                Ok(BlockedHash {
                    hash: row.get("hash"),
                    label: row.get("label"),
                    snapshot: row.get("snapshot"),
                    created_at: parse_time(&created_at)?,
                })
            })
            .collect()
    }

    async fn find_duplicate_pages(&self) -> Result<Vec<DuplicatePage>> {
        let rows = sqlx::query(
            r#"
            SELECT hash, COUNT(*) AS page_count, GROUP_CONCAT(DISTINCT comic_id) AS comic_ids
            FROM pages
            WHERE hash IS NOT NULL AND hash != '' AND state != ?
            GROUP BY hash
            HAVING COUNT(*) > 1
            ORDER BY hash
            "#,
        )
        .bind(PageState::Removed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let page_count: i64 = row.get("page_count");
                Ok(DuplicatePage {
                    hash: row.get("hash"),
                    page_count: page_count.max(0) as u64,
                    comic_ids: id_set(row.get("comic_ids"))?,
                })
            })
            .collect()
    }

    async fn find_deleted_pages(&self) -> Result<Vec<DeletedPageAndComic>> {
        let rows = sqlx::query(
            r#"
            SELECT hash, GROUP_CONCAT(DISTINCT comic_id) AS comic_ids
            FROM pages
            WHERE state = ? AND hash IS NOT NULL
            GROUP BY hash
            ORDER BY hash
            "#,
        )
        .bind(PageState::MarkedForDeletion.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DeletedPageAndComic {
                    hash: row.get("hash"),
                    comic_ids: id_set(row.get("comic_ids"))?,
                })
            })
            .collect()
    }
}
