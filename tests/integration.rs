use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn softcon_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("softcon");
    path
}

const INPUT: &str = r##"[
  {
    "uid": "p1",
    "title": "Demo",
    "summary": "# Demo\n\nA **small** project.",
    "teamInfo": {"members": [{"name": "Kim"}, {"name": "Lee"}]},
    "gitRepository": "https://github.com/x/y",
    "videoUrl": "https://youtu.be/z",
    "likeCount": "42",
    "commentCount": "abc"
  },
  {"title": "no uid"},
  {
    "uid": "p2",
    "images": ["/upload/a.png", "/upload/b.png"],
    "presentationUrl": "https://slides.example.com/p2"
  }
]"##;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("projects.json"), INPUT).unwrap();

    let config_content = format!(
        r#"[store]
backend = "sqlite"

[db]
path = "{root}/data/softcon.sqlite"

[upload]
input = "{root}/projects.json"

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("softcon.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_softcon(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = softcon_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("SOFTCON_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run softcon binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_softcon(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/softcon.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, first) = run_softcon(&config_path, &["init"]);
    let (_, stderr, second) = run_softcon(&config_path, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_upload_reports_counts() {
    let (_tmp, config_path) = setup_test_env();
    run_softcon(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_softcon(&config_path, &["upload", "--progress", "off"]);
    assert!(success, "upload failed: {}", stderr);
    assert!(stdout.contains("author: written"));
    assert!(stdout.contains("written: 2"));
    assert!(stdout.contains("skipped: 1"));
    assert!(stdout.contains("failed: 0"));
    assert!(stdout.trim_end().ends_with("ok"));
}

#[test]
fn test_get_after_upload() {
    let (_tmp, config_path) = setup_test_env();
    run_softcon(&config_path, &["upload", "--progress", "off"]);

    let (stdout, stderr, success) = run_softcon(&config_path, &["get", "p1"]);
    assert!(success, "get failed: {}", stderr);
    assert!(stdout.contains("title:        Demo"));
    assert!(stdout.contains("author_id:    softcon-author"));
    assert!(stdout.contains("likes:        42"));
    assert!(stdout.contains("comments:     0"));
    assert!(stdout.contains("keywords:     Kim, Lee"));
    assert!(stdout.contains("--- Links (2) ---"));

    let (stdout, _, success) = run_softcon(&config_path, &["get", "p2"]);
    assert!(success);
    assert!(stdout.contains("title:        제목 없음"));
    assert!(stdout.contains("[img-0] 이미지 1 /upload/a.png"));
    assert!(stdout.contains("[img-1] 이미지 2 /upload/b.png"));
}

#[test]
fn test_upload_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    run_softcon(&config_path, &["upload", "--progress", "off"]);
    let (first, _, _) = run_softcon(&config_path, &["get", "p2"]);

    let (stdout, _, success) = run_softcon(&config_path, &["upload", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("written: 2"));
    let (second, _, _) = run_softcon(&config_path, &["get", "p2"]);

    let strip = |s: &str| {
        s.lines()
            .filter(|l| !l.starts_with("created_at") && !l.starts_with("updated_at"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn test_upload_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_softcon(&config_path, &["upload", "--dry-run"]);
    assert!(success, "dry-run failed: {}", stderr);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("entries: 3"));
    assert!(stdout.contains("would write: 2"));
    assert!(stdout.contains("would skip: 1"));
    assert!(stdout.contains("links: 3"));

    let (_, _, found) = run_softcon(&config_path, &["get", "p1"]);
    assert!(!found, "dry-run must not write projects");
}

#[test]
fn test_upload_rejects_non_array_input() {
    let (tmp, config_path) = setup_test_env();
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"{"uid": "p1"}"#).unwrap();

    let (_, stderr, success) = run_softcon(
        &config_path,
        &["upload", "--input", bad.to_str().unwrap(), "--progress", "off"],
    );
    assert!(!success);
    assert!(stderr.contains("JSON array"));
}

#[test]
fn test_upload_missing_input_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("missing.json");

    let (_, _, success) = run_softcon(
        &config_path,
        &["upload", "--input", missing.to_str().unwrap()],
    );
    assert!(!success);
}

#[test]
fn test_get_missing_project_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_softcon(&config_path, &["init"]);

    let (_, stderr, success) = run_softcon(&config_path, &["get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("project not found"));
}

#[test]
fn test_author_commands() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_softcon(&config_path, &["author", "link-user-id"]);
    assert!(!success, "linking a missing author must fail: {}", stdout);

    let (stdout, _, success) = run_softcon(&config_path, &["author", "ensure"]);
    assert!(success);
    assert!(stdout.contains("created"));

    let (stdout, _, success) = run_softcon(&config_path, &["author", "ensure"]);
    assert!(success);
    assert!(stdout.contains("already exists"));

    let (stdout, stderr, success) = run_softcon(&config_path, &["author", "link-user-id"]);
    assert!(success, "link failed: {}", stderr);
    assert!(stdout.contains("userId = softcon-author"));
}

#[test]
fn test_view_writes_page() {
    let (tmp, config_path) = setup_test_env();
    run_softcon(&config_path, &["upload", "--progress", "off"]);
    let out = tmp.path().join("p1.html");

    let (stdout, stderr, success) = run_softcon(
        &config_path,
        &["view", "p1", "--out", out.to_str().unwrap()],
    );
    assert!(success, "view failed: {}", stderr);
    assert!(stdout.contains("links: 2"));

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("<title>Demo</title>"));
    assert!(html.contains("<strong>small</strong>"));
    assert!(html.contains("첨부 링크"));
    assert!(html.contains("rel=\"noopener noreferrer\""));
    assert!(!html.contains("첨부 자료"));
}
