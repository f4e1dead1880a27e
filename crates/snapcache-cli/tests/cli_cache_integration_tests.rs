//! CLI cache command integration tests

use rusqlite::Connection;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn setup_settings(temp_dir: &TempDir) {
    fs::write(
        temp_dir.path().join("clinic.sql"),
        "INSERT INTO `payment_method` VALUES ('CA','Cash'),('NE','NETS');\n\
         INSERT INTO `receipts` VALUES ('R1','2024-01-01','P1','0','10.00');\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("settings.toml"),
        "[database]\nsource = \"backup\"\nbackup_path = \"clinic.sql\"\ncache_path = \"cache.sqlite\"\n",
    )
    .unwrap();
}

fn snapcache(temp_dir: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_snapcache-cli"))
        .current_dir(temp_dir.path())
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

#[test]
fn test_cli_cache_ensure_builds_then_skips() {
    // Given: a settings file pointing at a dump
    let temp_dir = TempDir::new().unwrap();
    setup_settings(&temp_dir);

    // When: ensure runs twice
    let first = snapcache(&temp_dir, &["cache", "ensure"]);
    let second = snapcache(&temp_dir, &["cache", "ensure"]);

    // Then: the first rebuilds and the second is a no-op
    assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("Rebuilding SQLite cache ..."));
    assert!(stdout.contains("payment_method: 2 rows imported."));
    assert!(stdout.contains("SQLite cache rebuild complete."));

    assert!(second.status.success());
    assert_eq!(
        String::from_utf8_lossy(&second.stdout).trim(),
        "SQLite cache already up to date."
    );

    let conn = Connection::open(temp_dir.path().join("cache.sqlite")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM receipts", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_cli_cache_ensure_force() {
    let temp_dir = TempDir::new().unwrap();
    setup_settings(&temp_dir);
    assert!(snapcache(&temp_dir, &["cache", "ensure"]).status.success());

    let output = snapcache(&temp_dir, &["cache", "ensure", "--force"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Rebuilding SQLite cache ..."));
}

#[test]
fn test_cli_cache_status_lists_tables() {
    let temp_dir = TempDir::new().unwrap();
    setup_settings(&temp_dir);
    assert!(snapcache(&temp_dir, &["cache", "ensure"]).status.success());

    let output = snapcache(&temp_dir, &["cache", "status"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Source: backup"));
    assert!(stdout.contains("payment_method: 2 rows"));
    assert!(stdout.contains("patients: 0 rows"));
}

#[test]
fn test_cli_unknown_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("settings.toml"),
        "[database]\nsource = \"csv\"\n",
    )
    .unwrap();

    let output = snapcache(&temp_dir, &["cache", "ensure"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_CONFIGURATION"));
    assert!(!temp_dir.path().join("data").exists());
}
