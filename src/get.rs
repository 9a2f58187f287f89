//! Project retrieval by uid.
//!
//! Used by both the `softcon get` CLI command and `GET /projects/{id}`.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Config;
use crate::models::{ProjectRecord, StoredProject};
use crate::store::{open_store, Repository};

/// A stored project as returned by the CLI and the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    #[serde(flatten)]
    pub record: ProjectRecord,
    pub created_at: Option<String>, // ISO8601
    pub updated_at: Option<String>, // ISO8601
}

impl From<StoredProject> for ProjectResponse {
    fn from(stored: StoredProject) -> Self {
        Self {
            id: stored.id,
            record: stored.record,
            created_at: stored.created_at.map(|t| t.to_rfc3339()),
            updated_at: stored.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Core get function returning structured data (used by CLI and server).
pub async fn get_project(repo: &Repository, id: &str) -> Result<ProjectResponse> {
    match repo.get_project(id).await? {
        Some(stored) => Ok(stored.into()),
        None => bail!("project not found: {}", id),
    }
}

/// `softcon get`.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let repo = Repository::new(open_store(config).await?);
    let project = get_project(&repo, id).await?;
    let record = &project.record;

    println!("--- Project ---");
    println!("id:           {}", project.id);
    println!("title:        {}", record.title);
    println!("subtitle:     {}", record.subtitle);
    println!("author_id:    {}", record.author_id);
    if !record.thumbnail.is_empty() {
        println!("thumbnail:    {}", record.thumbnail);
    }
    if !record.source_url.is_null() {
        println!("source_url:   {}", record.source_url);
    }
    println!("likes:        {}", record.like_count);
    println!("comments:     {}", record.comment_count);
    println!("keywords:     {}", record.keywords.join(", "));
    println!(
        "created_at:   {}",
        project.created_at.as_deref().unwrap_or("-")
    );
    println!(
        "updated_at:   {}",
        project.updated_at.as_deref().unwrap_or("-")
    );
    println!();

    println!("--- Content ---");
    println!("{}", record.content);
    println!();

    println!("--- Files ({}) ---", record.files.len());
    for file in &record.files {
        println!("[{}] {} {}", file.file_id, file.filename, file.url);
    }
    println!();

    println!("--- Links ({}) ---", record.links.len());
    for link in &record.links {
        println!("[{}] {} {}", link.link_id, link.title, link.url);
    }

    Ok(())
}
