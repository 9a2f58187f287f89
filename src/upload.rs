//! Upload pipeline: exported JSON → `users` + `softcon_projects`.
//!
//! A run writes the author document, then walks the input array in order and
//! writes one normalized project per entry that has a `uid`. Every write is
//! awaited before the next one starts. A failed write is logged, recorded in
//! the [`UploadReport`], and the run moves on; there is no retry and no
//! rollback. Only errors outside those per-write guards (unreadable input,
//! unusable store) abort the run.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::config::{AuthorConfig, Config, LabelsConfig};
use crate::models::{AuthorRecord, RawProject, Role, AUTHOR_ID};
use crate::progress::{ProgressMode, UploadProgressEvent, UploadProgressReporter};
use crate::store::{open_store, Repository};
use crate::transform::{project_record, read_raw_project};

/// What happened to one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Written,
    /// No `uid`: nothing was written.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    /// Position in the input array.
    pub index: usize,
    pub uid: Option<String>,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub author: RecordOutcome,
    pub records: Vec<RecordReport>,
}

impl UploadReport {
    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|o| *o == RecordOutcome::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == RecordOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, RecordOutcome::Failed { .. }))
    }
}

/// Read the export. The top level must be a JSON array.
pub fn load_raw_projects(path: &Path) -> Result<Vec<RawProject>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file: {}", path.display()))?;

    let Value::Array(items) = value else {
        bail!(
            "input file must contain a JSON array of projects: {}",
            path.display()
        );
    };

    Ok(items.into_iter().map(read_raw_project).collect())
}

pub fn author_record(config: &AuthorConfig) -> AuthorRecord {
    AuthorRecord {
        display_name: config.display_name.clone(),
        role: Role::Admin,
        profile_image: config.profile_image.clone(),
        email: config.email.clone(),
        user_id: None,
    }
}

/// Full-replace write of `users/softcon-author`. Never fails the run.
pub async fn create_author_document(repo: &Repository, author: &AuthorRecord) -> RecordOutcome {
    match repo.put_author(AUTHOR_ID, author).await {
        Ok(()) => {
            tracing::info!(id = AUTHOR_ID, "author document written");
            RecordOutcome::Written
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::error!(id = AUTHOR_ID, error = %reason, "author document write failed");
            RecordOutcome::Failed { reason }
        }
    }
}

/// Write every project that has a `uid`, in input order, one at a time.
pub async fn upload_projects(
    repo: &Repository,
    projects: &[RawProject],
    labels: &LabelsConfig,
    progress: &dyn UploadProgressReporter,
) -> Vec<RecordReport> {
    let total = projects.len() as u64;
    let mut reports = Vec::with_capacity(projects.len());

    for (index, raw) in projects.iter().enumerate() {
        let outcome = match raw.uid.as_deref() {
            None => RecordOutcome::Skipped,
            Some(uid) => {
                let record = project_record(raw, labels);
                match repo.put_project(uid, &record).await {
                    Ok(()) => {
                        tracing::info!(uid, "project uploaded");
                        RecordOutcome::Written
                    }
                    Err(e) => {
                        let reason = format!("{:#}", e);
                        tracing::error!(uid, error = %reason, "project upload failed");
                        RecordOutcome::Failed { reason }
                    }
                }
            }
        };

        reports.push(RecordReport {
            index,
            uid: raw.uid.clone(),
            outcome,
        });
        progress.report(UploadProgressEvent::Uploading {
            n: index as u64 + 1,
            total,
        });
    }

    reports
}

/// Author first, then projects.
pub async fn run_upload(
    config: &Config,
    repo: &Repository,
    input: &Path,
    progress: &dyn UploadProgressReporter,
) -> Result<UploadReport> {
    progress.report(UploadProgressEvent::Loading {
        input: input.display().to_string(),
    });
    let projects = load_raw_projects(input)?;

    let author = create_author_document(repo, &author_record(&config.author)).await;
    let records = upload_projects(repo, &projects, &config.labels, progress).await;

    tracing::info!(entries = projects.len(), "upload finished");
    Ok(UploadReport { author, records })
}

/// `softcon upload`.
pub async fn run_upload_cmd(
    config: &Config,
    input: Option<&Path>,
    dry_run: bool,
    progress: Option<ProgressMode>,
) -> Result<()> {
    let input = input.unwrap_or(config.upload.input.as_path());

    if dry_run {
        let projects = load_raw_projects(input)?;
        let with_uid = projects.iter().filter(|p| p.uid.is_some()).count();
        let links: usize = projects
            .iter()
            .filter(|p| p.uid.is_some())
            .map(|p| project_record(p, &config.labels).links.len())
            .sum();
        println!("upload {} (dry-run)", input.display());
        println!("  entries: {}", projects.len());
        println!("  would write: {}", with_uid);
        println!("  would skip: {}", projects.len() - with_uid);
        println!("  links: {}", links);
        return Ok(());
    }

    let repo = Repository::new(open_store(config).await?);
    let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
    let report = run_upload(config, &repo, input, reporter.as_ref()).await?;

    println!("upload {}", input.display());
    println!(
        "  author: {}",
        match report.author {
            RecordOutcome::Written => "written",
            _ => "failed",
        }
    );
    println!("  written: {}", report.written());
    println!("  skipped: {}", report.skipped());
    println!("  failed: {}", report.failed());
    for failure in report.failures() {
        if let RecordOutcome::Failed { ref reason } = failure.outcome {
            println!(
                "    {}: {}",
                failure.uid.as_deref().unwrap_or("?"),
                reason
            );
        }
    }
    println!("ok");

    Ok(())
}
