//! In-memory [`DocumentStore`] for tests.
//!
//! Collections are `BTreeMap`s behind one `std::sync::RwLock`, so
//! [`list_ids`](DocumentStore::list_ids) comes back sorted for free. Every
//! successful write is appended to a log that tests can inspect, and
//! [`InMemoryStore::fail_writes_for`] makes writes to chosen ids fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{server_timestamp, DocumentStore, Fields};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

pub struct InMemoryStore {
    collections: RwLock<Collections>,
    failing: RwLock<HashSet<String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Make every later write to a document with this id fail.
    pub fn fail_writes_for(&self, id: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(id.to_string());
        }
    }

    /// `(collection, id)` of each successful write, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of documents currently in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn check_writable(&self, collection: &str, id: &str) -> Result<()> {
        let failing = self.failing.read().map_err(|_| poisoned())?;
        if failing.contains(id) {
            bail!("write rejected: {}/{}", collection, id);
        }
        Ok(())
    }

    fn log_write(&self, collection: &str, id: &str) -> Result<()> {
        self.writes
            .lock()
            .map_err(|_| poisoned())?
            .push((collection.to_string(), id.to_string()));
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut fields: Fields,
        server_timestamps: &[&str],
    ) -> Result<()> {
        self.check_writable(collection, id)?;
        for name in server_timestamps {
            fields.insert((*name).to_string(), server_timestamp());
        }
        {
            let mut collections = self.collections.write().map_err(|_| poisoned())?;
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), fields);
        }
        self.log_write(collection, id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.check_writable(collection, id)?;
        {
            let mut collections = self.collections.write().map_err(|_| poisoned())?;
            let doc = collections
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| anyhow!("document not found: {}/{}", collection, id))?;
            doc.extend(fields);
        }
        self.log_write(collection, id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }
}
