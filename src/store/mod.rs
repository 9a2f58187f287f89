//! Document store abstraction.
//!
//! A store holds named collections of string-keyed JSON documents. The
//! [`DocumentStore`] trait is the raw surface every backend implements;
//! [`Repository`] layers the typed project and author operations on top of
//! it, so the upload pipeline and the viewer never touch backend specifics.
//!
//! | Backend | Module | Used for |
//! |---------|--------|----------|
//! | SQLite | [`sqlite`] | local runs, integration tests |
//! | Firestore REST | [`firestore`] | the production database |
//! | In-memory | [`memory`] | unit tests, dry experiments |

pub mod firestore;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, StoreBackend};
use crate::models::{AuthorRecord, ProjectRecord, Stored, StoredAuthor, StoredProject};

/// Collection holding the author document.
pub const USERS: &str = "users";
/// Collection holding migrated projects.
pub const SOFTCON_PROJECTS: &str = "softcon_projects";

/// Top-level fields of one document.
pub type Fields = serde_json::Map<String, Value>;

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

/// Storage backend for key-identified JSON documents.
///
/// Writes are unconditional: no version checks, no transactions across
/// documents. Two writers of the same key end with the last one's content.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Replace the whole document at `collection/id`.
    ///
    /// Afterwards the document holds exactly `fields`, plus each name in
    /// `server_timestamps` set to the store's clock at write time.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        server_timestamps: &[&str],
    ) -> Result<()>;

    /// Merge `fields` into an existing document. Fails if it does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>>;

    /// Document ids in `collection`, sorted.
    async fn list_ids(&self, collection: &str) -> Result<Vec<String>>;
}

/// Build the store selected by `[store].backend`.
pub async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Sqlite => Arc::new(sqlite::SqliteStore::open(config).await?),
        StoreBackend::Firestore => Arc::new(firestore::FirestoreStore::from_config(
            &config.firestore,
        )?),
        StoreBackend::Memory => Arc::new(memory::InMemoryStore::new()),
    };
    Ok(store)
}

/// Timestamp value written by the local backends for server-assigned fields.
pub(crate) fn server_timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Typed access to the `users` and `softcon_projects` collections.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Full replace of `softcon_projects/<id>`; both timestamps are reset.
    pub async fn put_project(&self, id: &str, record: &ProjectRecord) -> Result<()> {
        let fields = to_fields(record)?;
        self.store
            .set(SOFTCON_PROJECTS, id, fields, &[CREATED_AT, UPDATED_AT])
            .await
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<StoredProject>> {
        match self.store.get(SOFTCON_PROJECTS, id).await? {
            Some(fields) => Ok(Some(from_fields(id, fields)?)),
            None => Ok(None),
        }
    }

    pub async fn list_project_ids(&self) -> Result<Vec<String>> {
        self.store.list_ids(SOFTCON_PROJECTS).await
    }

    /// Full replace of `users/<id>`.
    pub async fn put_author(&self, id: &str, record: &AuthorRecord) -> Result<()> {
        let fields = to_fields(record)?;
        self.store.set(USERS, id, fields, &[CREATED_AT]).await
    }

    pub async fn get_author(&self, id: &str) -> Result<Option<StoredAuthor>> {
        match self.store.get(USERS, id).await? {
            Some(fields) => Ok(Some(from_fields(id, fields)?)),
            None => Ok(None),
        }
    }

    /// Write the author only if `users/<id>` does not exist yet.
    ///
    /// Returns `true` when a document was created. The check and the write
    /// are separate calls; a concurrent creator can still race it.
    pub async fn ensure_author(&self, id: &str, record: &AuthorRecord) -> Result<bool> {
        if self.store.get(USERS, id).await?.is_some() {
            return Ok(false);
        }
        self.put_author(id, record).await?;
        Ok(true)
    }

    /// Merge `fields` into an existing author document.
    pub async fn update_author(&self, id: &str, fields: Fields) -> Result<()> {
        self.store.update(USERS, id, fields).await
    }
}

fn to_fields<T: Serialize>(record: &T) -> Result<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => bail!("record serialized to a non-object value: {}", other),
    }
}

fn from_fields<T: DeserializeOwned>(id: &str, mut fields: Fields) -> Result<Stored<T>> {
    let created_at = fields.remove(CREATED_AT).and_then(parse_timestamp);
    let updated_at = fields.remove(UPDATED_AT).and_then(parse_timestamp);
    let record = serde_json::from_value(Value::Object(fields))
        .with_context(|| format!("malformed document: {}", id))?;
    Ok(Stored {
        id: id.to_string(),
        record,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(value: Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, AUTHOR_ID};
    use memory::InMemoryStore;
    use serde_json::json;

    fn author() -> AuthorRecord {
        AuthorRecord {
            display_name: "아주대학교 소프트콘".into(),
            role: Role::Admin,
            profile_image: "/path/to/softcon-logo.png".into(),
            email: "softcon@ajou.ac.kr".into(),
            user_id: None,
        }
    }

    fn repo() -> (Arc<InMemoryStore>, Repository) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), Repository::new(store))
    }

    #[tokio::test]
    async fn author_round_trip_carries_created_at() {
        let (_, repo) = repo();
        repo.put_author(AUTHOR_ID, &author()).await.unwrap();

        let stored = repo.get_author(AUTHOR_ID).await.unwrap().unwrap();
        assert_eq!(stored.id, AUTHOR_ID);
        assert_eq!(stored.record, author());
        assert!(stored.created_at.is_some());
        assert!(stored.updated_at.is_none());
    }

    #[tokio::test]
    async fn ensure_author_keeps_existing_document() {
        let (_, repo) = repo();
        let mut first = author();
        first.display_name = "original".into();
        repo.put_author(AUTHOR_ID, &first).await.unwrap();

        let created = repo.ensure_author(AUTHOR_ID, &author()).await.unwrap();
        assert!(!created);
        let stored = repo.get_author(AUTHOR_ID).await.unwrap().unwrap();
        assert_eq!(stored.record.display_name, "original");
    }

    #[tokio::test]
    async fn ensure_author_creates_missing_document() {
        let (_, repo) = repo();
        assert!(repo.ensure_author(AUTHOR_ID, &author()).await.unwrap());
        assert!(repo.get_author(AUTHOR_ID).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_author_merges_fields() {
        let (_, repo) = repo();
        repo.put_author(AUTHOR_ID, &author()).await.unwrap();

        let mut fields = Fields::new();
        fields.insert("userId".into(), json!(AUTHOR_ID));
        repo.update_author(AUTHOR_ID, fields).await.unwrap();

        let stored = repo.get_author(AUTHOR_ID).await.unwrap().unwrap();
        assert_eq!(stored.record.user_id.as_deref(), Some(AUTHOR_ID));
        assert_eq!(stored.record.email, "softcon@ajou.ac.kr");
        assert!(stored.created_at.is_some());
    }

    #[tokio::test]
    async fn update_author_fails_when_missing() {
        let (_, repo) = repo();
        let err = repo.update_author(AUTHOR_ID, Fields::new()).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn malformed_project_document_is_an_error() {
        let (store, repo) = repo();
        let mut fields = Fields::new();
        fields.insert("title".into(), json!(42));
        store.set(SOFTCON_PROJECTS, "bad", fields, &[]).await.unwrap();

        assert!(repo.get_project("bad").await.is_err());
        assert!(repo.get_project("missing").await.unwrap().is_none());
    }
}
