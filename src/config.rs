//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or [`Config::default`]) is a
//! working configuration that targets a local SQLite store. Credentials for
//! the Firestore backend never live in the file; see
//! [`crate::store::firestore`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub firestore: FirestoreConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub author: AuthorConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which [`DocumentStore`](crate::store::DocumentStore) backs the commands.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Firestore,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/softcon.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirestoreConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_database(),
            base_url: default_firestore_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}
fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("./softcon_data/project_details.json")
}

/// Fixed values written to the synthetic author document.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthorConfig {
    pub display_name: String,
    pub profile_image: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            display_name: "아주대학교 소프트콘".to_string(),
            profile_image: "/path/to/softcon-logo.png".to_string(),
            email: "softcon@ajou.ac.kr".to_string(),
        }
    }
}

/// Localized strings baked into migrated records.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LabelsConfig {
    pub untitled: String,
    pub subtitle: String,
    /// Prefix of the ordinal file label, e.g. `이미지 1`.
    pub image: String,
    pub github: String,
    pub presentation: String,
    pub video: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            untitled: "제목 없음".to_string(),
            subtitle: "소프트콘 프로젝트".to_string(),
            image: "이미지".to_string(),
            github: "GitHub 저장소".to_string(),
            presentation: "발표자료".to_string(),
            video: "발표 동영상".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewerConfig {
    /// Base that relative asset URLs (`/upload/...`) are resolved against.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_base_url: default_asset_base_url(),
            fetch_timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_asset_base_url() -> String {
    "https://softcon.ajou.ac.kr".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.labels.untitled.is_empty() {
        bail!("labels.untitled must not be empty");
    }

    if config.firestore.timeout_secs == 0 {
        bail!("firestore.timeout_secs must be > 0");
    }

    if config.viewer.fetch_timeout_secs == 0 {
        bail!("viewer.fetch_timeout_secs must be > 0");
    }

    if !config.viewer.asset_base_url.starts_with("http") {
        bail!(
            "viewer.asset_base_url must be an http(s) URL, got '{}'",
            config.viewer.asset_base_url
        );
    }

    if config.store.backend == StoreBackend::Firestore && config.firestore.database.is_empty() {
        bail!("firestore.database must not be empty when store.backend is 'firestore'");
    }

    Ok(())
}
