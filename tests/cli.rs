//! CLI smoke tests that spawn the compiled `inq` binary.
//!
//! Commands that reach external APIs are covered by the library-level tests
//! with substituted providers; here we exercise the argument surface and
//! the commands that run fully offline.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn inq_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("inq");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[store]
path = "{}/data/inquest.db"

[embedding]
model = "text-embedding-3-small"
dims = 1536

[chat]
model = "llama-3.3-70b-versatile"

[server]
bind = "127.0.0.1:7431"
"#,
        root.display()
    );

    let config_path = config_dir.join("inq.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_inq(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = inq_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run inq binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_inq(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/inquest.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_inq(&config_path, &["init"]);
    let (_, _, success2) = run_inq(&config_path, &["init"]);
    assert!(success1);
    assert!(success2);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_inq(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}

#[test]
fn test_ingest_requires_arguments() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_inq(&config_path, &["ingest", "urls"]);
    assert!(!success);
}
