//! Firestore REST [`DocumentStore`].
//!
//! Talks to the v1 REST API with `reqwest`. Writes go through
//! `documents:commit` so that server timestamps can be requested as
//! `REQUEST_TIME` field transforms:
//!
//! - full replace: an `update` write without `updateMask`;
//! - merge: an `update` write with `updateMask` and a
//!   `currentDocument.exists = true` precondition.
//!
//! Credentials come from the environment, never from the config file:
//!
//! | Variable | Use |
//! |----------|-----|
//! | `FIREBASE_API_KEY` | appended as `?key=` |
//! | `FIREBASE_AUTH_TOKEN` | `Authorization: Bearer` (optional) |
//! | `FIREBASE_PROJECT_ID` | overrides `[firestore].project_id` |
//!
//! Failed requests are reported as errors with the HTTP status and body.
//! Nothing is retried.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Map, Value};

use super::{DocumentStore, Fields};
use crate::config::FirestoreConfig;

const PAGE_SIZE: usize = 300;

pub struct FirestoreStore {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl FirestoreStore {
    pub fn from_config(config: &FirestoreConfig) -> Result<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .ok()
            .or_else(|| config.project_id.clone())
            .ok_or_else(|| {
                anyhow!("firestore.project_id not set and FIREBASE_PROJECT_ID not in environment")
            })?;
        let api_key = std::env::var("FIREBASE_API_KEY").ok();
        let auth_token = std::env::var("FIREBASE_AUTH_TOKEN").ok();
        if api_key.is_none() && auth_token.is_none() {
            bail!("FIREBASE_API_KEY or FIREBASE_AUTH_TOKEN environment variable must be set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id,
            database: config.database.clone(),
            api_key,
            auth_token,
        })
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    /// Resource name used inside write bodies.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }

    /// URL of a document or collection, with each path segment encoded.
    fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, self.documents_root()))
            .with_context(|| format!("invalid firestore.base_url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("firestore.base_url cannot carry a path: {}", self.base_url))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            req = req.query(&[("key", key)]);
        }
        if let Some(ref token) = self.auth_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn commit(&self, write: Value) -> Result<()> {
        let url = format!("{}/{}:commit", self.base_url, self.documents_root());
        let url = Url::parse(&url).with_context(|| format!("invalid commit url: {}", url))?;
        let body = json!({ "writes": [write] });

        let response = self.request(Method::POST, url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Firestore commit failed {}: {}", status, text);
        }
        Ok(())
    }
}

/// Body of a full-replace write with server-assigned timestamps.
fn replace_write(name: &str, fields: &Fields, server_timestamps: &[&str]) -> Value {
    let mut write = json!({
        "update": { "name": name, "fields": encode_fields(fields) }
    });
    if !server_timestamps.is_empty() {
        let transforms: Vec<Value> = server_timestamps
            .iter()
            .map(|path| {
                json!({ "fieldPath": quote_field_path(path), "setToServerValue": "REQUEST_TIME" })
            })
            .collect();
        write["updateTransforms"] = Value::Array(transforms);
    }
    write
}

/// Body of a merge write that fails when the document is missing.
fn merge_write(name: &str, fields: &Fields) -> Value {
    let paths: Vec<String> = fields.keys().map(|k| quote_field_path(k)).collect();
    json!({
        "update": { "name": name, "fields": encode_fields(fields) },
        "updateMask": { "fieldPaths": paths },
        "currentDocument": { "exists": true }
    })
}

/// Field paths that are not simple identifiers must be backtick-quoted.
fn quote_field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// JSON value → Firestore `Value` message.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if items.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                let values: Vec<Value> = items.iter().map(encode_value).collect();
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Firestore `Value` message → JSON value. Timestamps and references come
/// back as strings.
pub fn decode_value(value: &Value) -> Result<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| anyhow!("Firestore value is not an object: {}", value))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| anyhow!("empty Firestore value"))?;

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" | "geoPointValue" => inner.clone(),
        "integerValue" => {
            let text = inner
                .as_str()
                .ok_or_else(|| anyhow!("integerValue is not a string: {}", inner))?;
            Value::from(text.parse::<i64>().context("integerValue out of range")?)
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Value::Object(decode_fields(&fields)?)
        }
        other => bail!("unsupported Firestore value type: {}", other),
    };
    Ok(decoded)
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Fields> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        server_timestamps: &[&str],
    ) -> Result<()> {
        let name = self.document_name(collection, id);
        self.commit(replace_write(&name, &fields, server_timestamps))
            .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let name = self.document_name(collection, id);
        self.commit(merge_write(&name, &fields)).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        let url = self.resource_url(&[collection, id])?;
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Firestore get {}/{} failed {}: {}", collection, id, status, text);
        }

        let body: Value = response.json().await?;
        let fields = body
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(Some(decode_fields(&fields)?))
    }

    async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.resource_url(&[collection])?;
            let mut req = self
                .request(Method::GET, url)
                .query(&[("pageSize", PAGE_SIZE.to_string())])
                .query(&[("mask.fieldPaths", "__name__")]);
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let response = req.send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                bail!("Firestore list {} failed {}: {}", collection, status, text);
            }

            let body: Value = response.json().await?;
            if let Some(docs) = body.get("documents").and_then(Value::as_array) {
                for doc in docs {
                    if let Some(name) = doc.get("name").and_then(Value::as_str) {
                        if let Some(id) = name.rsplit('/').next() {
                            ids.push(id.to_string());
                        }
                    }
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        ids.sort();
        Ok(ids)
    }
}
