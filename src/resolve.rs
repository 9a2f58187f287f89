//! Stored project → viewer props.
//!
//! A [`ProjectRecord`] only carries URLs. [`resolve_post`] fetches the
//! thumbnail and every file through a [`ResourceFetcher`] and builds the
//! in-memory [`PostView`]. Relative URLs (the export uses `/upload/...`
//! paths) are made absolute against `[viewer].asset_base_url` first.
//!
//! A fetch that fails is logged and the item left out of the view; the
//! page still renders.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use crate::config::{Config, ViewerConfig};
use crate::models::ProjectRecord;
use crate::store::{open_store, Repository};
use crate::viewer::download::{DirectorySink, ObjectUrlRegistry};
use crate::viewer::{BinaryResource, FileAttachment, LinkAttachment, PostView};

/// Loads the bytes behind a URL.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// `name` becomes the resource's display and download name.
    async fn fetch(&self, url: &str, name: &str) -> Result<BinaryResource>;
}

/// Fetches over HTTP(S).
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, name: &str) -> Result<BinaryResource> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("GET {}", url))?;

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream")
            .unwrap_or_else(|| media_type_for_path(url).to_string());

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(BinaryResource::new(name, media_type, bytes.to_vec()))
    }
}

/// Guess a media type from the extension of a URL or file name.
pub fn media_type_for_path(path: &str) -> &'static str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Make `url` absolute against `base`. Empty input yields `None`.
pub fn absolute_url(base: &str, url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
        return Some(url.to_string());
    }
    if let Some(rest) = url.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    let base = base.trim_end_matches('/');
    match url.strip_prefix('/') {
        Some(path) => Some(format!("{}/{}", base, path)),
        None => Some(format!("{}/{}", base, url)),
    }
}

/// Build the viewer props for one project.
pub async fn resolve_post(
    record: &ProjectRecord,
    fetcher: &dyn ResourceFetcher,
    base_url: &str,
) -> PostView {
    let mut view = PostView::new(&record.title, &record.subtitle, &record.content)
        .with_keywords(record.keywords.clone());

    if let Some(url) = absolute_url(base_url, &record.thumbnail) {
        let name = file_name_of(&url);
        match fetcher.fetch(&url, &name).await {
            Ok(thumb) => view = view.with_thumbnail(thumb),
            Err(e) => tracing::warn!(url = %url, error = %format!("{:#}", e), "thumbnail unavailable"),
        }
    }

    let mut files = Vec::with_capacity(record.files.len());
    for file in &record.files {
        let Some(url) = absolute_url(base_url, &file.url) else {
            tracing::warn!(file_id = %file.file_id, "file has no url");
            continue;
        };
        let name = download_name(&file.filename, &url);
        match fetcher.fetch(&url, &name).await {
            Ok(resource) => files.push(FileAttachment {
                file_id: file.file_id.clone(),
                file: Arc::new(resource),
                description: None,
            }),
            Err(e) => {
                tracing::warn!(file_id = %file.file_id, url = %url, error = %format!("{:#}", e), "file unavailable")
            }
        }
    }

    let links = record
        .links
        .iter()
        .filter(|l| !l.url.is_empty())
        .map(|l| LinkAttachment {
            url: l.url.clone(),
            description: Some(l.title.clone()).filter(|t| !t.is_empty()),
        })
        .collect();

    view.with_files(files).with_links(links)
}

/// `filename`, plus the URL's extension when the name has none
/// (`이미지 1` + `.../a.png` → `이미지 1.png`).
pub fn download_name(filename: &str, url: &str) -> String {
    if Path::new(filename).extension().is_some() {
        return filename.to_string();
    }
    let last = file_name_of(url);
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}.{}", filename, ext)
        }
        _ => filename.to_string(),
    }
}

fn file_name_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("thumbnail")
        .to_string()
}

/// Position of `file_id` among the files that made it into `view`.
///
/// Files that failed to resolve are absent from the view, so the record's
/// index cannot be used directly.
pub fn view_index_of(record: &ProjectRecord, view: &PostView, file_id: &str) -> Result<usize> {
    if !record.files.iter().any(|f| f.file_id == file_id) {
        bail!("no file with id '{}'", file_id);
    }
    view.files
        .iter()
        .position(|a| a.file_id == file_id)
        .ok_or_else(|| anyhow!("file '{}' could not be loaded", file_id))
}

async fn load_view(config: &Config, uid: &str) -> Result<(ProjectRecord, PostView)> {
    let repo = Repository::new(open_store(config).await?);
    let Some(stored) = repo.get_project(uid).await? else {
        bail!("project not found: {}", uid);
    };
    let fetcher = HttpFetcher::new(&config.viewer)?;
    let view = resolve_post(&stored.record, &fetcher, &config.viewer.asset_base_url).await;
    Ok((stored.record, view))
}

/// `softcon view`: render a stored project as an HTML page.
pub async fn run_view(
    config: &Config,
    uid: &str,
    out: Option<&Path>,
    preview: Option<&str>,
) -> Result<()> {
    let (record, mut view) = load_view(config, uid).await?;
    if let Some(file_id) = preview {
        let index = view_index_of(&record, &view, file_id)?;
        view.select_file(index)?;
    }

    let page = view.render_page();
    match out {
        Some(path) => {
            std::fs::write(path, &page)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("view {} -> {}", uid, path.display());
            println!("  files: {}/{}", view.files.len(), record.files.len());
            println!("  links: {}", view.links.len());
        }
        None => println!("{}", page),
    }
    Ok(())
}

/// `softcon download`: preview one file and save it into `out_dir`.
pub async fn run_download(config: &Config, uid: &str, file_id: &str, out_dir: &Path) -> Result<()> {
    let (record, mut view) = load_view(config, uid).await?;
    let index = view_index_of(&record, &view, file_id)?;
    view.select_file(index)?;

    let sink = DirectorySink::new(out_dir);
    let registry = ObjectUrlRegistry::new();
    view.download_selected(&registry, &sink)?;

    let target: PathBuf = sink.target_path(&view.files[index].file.name);
    println!("downloaded {}", target.display());
    Ok(())
}
