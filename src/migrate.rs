//! SQLite schema for the local document store.
//!
//! One table holds every collection. Documents are stored as JSON text and
//! replaced wholesale on each write, mirroring the hosted store's semantics.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::store::sqlite;

/// `softcon init`: create the database file and schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = sqlite::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent; safe to call on every open.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            written_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_written_at ON documents(collection, written_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
