//! Upload progress reporting.
//!
//! Progress goes to **stderr** so the summary printed on stdout stays
//! parseable for scripts.

use std::io::Write;

/// A single progress event for an upload run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadProgressEvent {
    /// Input file is being read and validated. Total unknown.
    Loading { input: String },
    /// `n` entries handled out of `total` (written, skipped, or failed).
    Uploading { n: u64, total: u64 },
}

/// Receives progress events from the upload pipeline.
pub trait UploadProgressReporter: Send + Sync {
    fn report(&self, event: UploadProgressEvent);
}

/// "upload  1,234 / 5,000 projects" on stderr.
pub struct StderrProgress;

impl UploadProgressReporter for StderrProgress {
    fn report(&self, event: UploadProgressEvent) {
        let line = match &event {
            UploadProgressEvent::Loading { input } => format!("upload  loading {}...\n", input),
            UploadProgressEvent::Uploading { n, total } => format!(
                "upload  {} / {} projects\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl UploadProgressReporter for JsonProgress {
    fn report(&self, event: UploadProgressEvent) {
        let obj = match &event {
            UploadProgressEvent::Loading { input } => serde_json::json!({
                "event": "progress",
                "phase": "loading",
                "input": input
            }),
            UploadProgressEvent::Uploading { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "uploading",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl UploadProgressReporter for NoProgress {
    fn report(&self, _event: UploadProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// `--progress` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn UploadProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
