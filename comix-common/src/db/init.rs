//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the comix tables.
//! Every statement is idempotent so startup can run it unconditionally.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every comix table and index
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_comics_table(pool).await?;
    create_pages_table(pool).await?;
    create_blocked_hashes_table(pool).await?;

    Ok(())
}

async fn create_comics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comics (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            archive_type TEXT NOT NULL,
            state TEXT NOT NULL,
            metadata_read INTEGER NOT NULL DEFAULT 0,
            metadata_entry TEXT,
            metadata_raw BLOB,
            metadata_json TEXT,
            file_hash TEXT,
            file_size INTEGER,
            file_details_created_at TEXT,
            added_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comics_state ON comics(state)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_pages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY,
            comic_id TEXT NOT NULL REFERENCES comics(id) ON DELETE CASCADE,
            page_number INTEGER NOT NULL,
            filename TEXT NOT NULL,
            hash TEXT,
            width INTEGER NOT NULL DEFAULT -1,
            height INTEGER NOT NULL DEFAULT -1,
            state TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_comic ON pages(comic_id, page_number)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_hash ON pages(hash)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_blocked_hashes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blocked_hashes (
            hash TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            snapshot BLOB,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
