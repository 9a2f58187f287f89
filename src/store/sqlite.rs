//! SQLite-backed [`DocumentStore`].
//!
//! Each document is one row of the `documents` table (see
//! [`crate::migrate`]) with its fields serialized as JSON text.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{server_timestamp, DocumentStore, Fields};
use crate::config::Config;
use crate::migrate;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self { pool })
    }
}

fn encode(fields: &Fields) -> Result<String> {
    Ok(serde_json::to_string(fields)?)
}

fn decode(collection: &str, id: &str, body: &str) -> Result<Fields> {
    match serde_json::from_str(body)
        .with_context(|| format!("corrupt document body: {}/{}", collection, id))?
    {
        Value::Object(map) => Ok(map),
        _ => bail!("document body is not an object: {}/{}", collection, id),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut fields: Fields,
        server_timestamps: &[&str],
    ) -> Result<()> {
        for name in server_timestamps {
            fields.insert((*name).to_string(), server_timestamp());
        }

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, written_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                body = excluded.body,
                written_at = excluded.written_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(encode(&fields)?)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(body) = body else {
            bail!("document not found: {}/{}", collection, id);
        };

        let mut existing = decode(collection, id, &body)?;
        existing.extend(fields);

        sqlx::query(
            "UPDATE documents SET body = ?, written_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(encode(&existing)?)
        .bind(chrono::Utc::now().timestamp())
        .bind(collection)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        body.map(|b| decode(collection, id, &b)).transpose()
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM documents WHERE collection = ? ORDER BY id ASC")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }
}
