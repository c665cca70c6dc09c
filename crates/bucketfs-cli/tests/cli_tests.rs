#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated workspace: a store file and a config dir nobody else touches.
struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("bucketfs").unwrap();
        cmd.env("BUCKETFS_CONFIG_DIR", self.dir.path())
            .env("BUCKETFS_STORE", self.store())
            .env_remove("BUCKETFS_CONFIG")
            .env_remove("BUCKETFS_IDENTITY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Bucket `photos` owned by `alice` holding one nested object.
    fn seeded() -> Self {
        let env = Self::new();
        env.cmd()
            .args(["--identity", "alice", "mb", "photos"])
            .assert()
            .success();
        env.cmd()
            .args(["put", "/photos/2024/beach.jpg", "-"])
            .write_stdin("sand and sea")
            .assert()
            .success();
        env
    }
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help() {
    Env::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("object store"));
}

#[test]
fn test_version() {
    Env::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bucketfs"));
}

// ============================================================================
// Store round trip
// ============================================================================

#[test]
fn test_put_then_cat() {
    let env = Env::seeded();
    env.cmd()
        .args(["cat", "/photos/2024/beach.jpg"])
        .assert()
        .success()
        .stdout("sand and sea");
}

#[test]
fn test_put_from_local_file() {
    let env = Env::seeded();
    let local = env.dir.path().join("note.txt");
    std::fs::write(&local, "from disk").unwrap();

    env.cmd()
        .args(["put", "/photos/note.txt"])
        .arg(&local)
        .assert()
        .success();
    env.cmd()
        .args(["cat", "photos/note.txt"])
        .assert()
        .success()
        .stdout("from disk");
}

#[test]
fn test_store_file_is_created() {
    let env = Env::seeded();
    assert!(env.store().exists());
}

#[test]
fn test_cat_missing_is_not_found() {
    let env = Env::seeded();
    env.cmd()
        .args(["cat", "/photos/nope.jpg"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_duplicate_bucket() {
    let env = Env::seeded();
    env.cmd().args(["mb", "photos"]).assert().code(5);
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn test_ls_shows_implicit_directory() {
    let env = Env::seeded();
    env.cmd()
        .args(["ls", "/photos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/photos/2024/"))
        .stdout(predicate::str::contains("beach.jpg").not());
}

#[test]
fn test_ls_root_lists_buckets() {
    let env = Env::seeded();
    env.cmd()
        .args(["--identity", "bob", "mb", "archive"])
        .assert()
        .success();
    env.cmd()
        .args(["ls", "/"])
        .assert()
        .success()
        .stdout("/archive/\n/photos/\n");
}

#[test]
fn test_ls_root_json_shows_owner() {
    let env = Env::seeded();
    let output = env.cmd().args(["ls", "--json", "/"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let buckets = json["buckets"].as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["name"], "photos");
    assert_eq!(buckets[0]["root"], "/photos/");
    assert_eq!(buckets[0]["ownerId"], "alice");
}

#[test]
fn test_put_into_missing_bucket_is_not_found() {
    let env = Env::seeded();
    env.cmd()
        .args(["put", "/nope/file.txt", "-"])
        .write_stdin("x")
        .assert()
        .code(3);
    env.cmd().args(["mkdir", "/nope/dir"]).assert().code(3);
}

#[test]
fn test_ls_recursive_json() {
    let env = Env::seeded();
    let output = env
        .cmd()
        .args(["ls", "-r", "--json", "/photos"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["path"], "/photos/2024/");
    assert_eq!(entries[0]["type"], "directory");
    assert_eq!(entries[1]["path"], "/photos/2024/beach.jpg");
    assert_eq!(entries[1]["size"], 12);
}

#[test]
fn test_ls_long_table() {
    let env = Env::seeded();
    env.cmd()
        .args(["ls", "-l", "/photos/2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12 B"));
}

#[test]
fn test_ls_on_file_is_invalid() {
    let env = Env::seeded();
    env.cmd()
        .args(["ls", "/photos/2024/beach.jpg"])
        .assert()
        .code(2);
}

#[test]
fn test_stat_implicit_directory_json() {
    let env = Env::seeded();
    let output = env
        .cmd()
        .args(["stat", "--json", "/photos/2024"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["isDirectory"], true);
    assert_eq!(json["isRegularFile"], false);
    assert_eq!(json["size"], 0);
    assert_eq!(json["fileKey"], "2024/");
}

#[test]
fn test_stat_posix_shows_owner() {
    let env = Env::seeded();
    env.cmd()
        .args(["stat", "--posix", "/photos/2024/beach.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("owner"))
        .stdout(predicate::str::contains("alice"));
}

#[test]
fn test_stat_selector() {
    let env = Env::seeded();
    let output = env
        .cmd()
        .args(["stat", "--json", "-a", "basic:size", "/photos/2024/beach.jpg"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json, serde_json::json!({ "size": 12 }));
}

#[test]
fn test_rm_non_empty_directory_fails() {
    let env = Env::seeded();
    env.cmd()
        .args(["rm", "/photos/2024"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("directory not empty"));

    // Nothing was removed
    env.cmd()
        .args(["exists", "/photos/2024/beach.jpg"])
        .assert()
        .success();
}

#[test]
fn test_rm_recursive() {
    let env = Env::seeded();
    env.cmd().args(["mkdir", "/photos/2024/raw"]).assert().success();
    env.cmd()
        .args(["rm", "-r", "/photos/2024"])
        .assert()
        .success();
    env.cmd().args(["exists", "/photos/2024"]).assert().code(1);
}

#[test]
fn test_mkdir_then_rm_empty() {
    let env = Env::seeded();
    env.cmd().args(["mkdir", "/photos/albums"]).assert().success();
    env.cmd()
        .args(["ls", "/photos"])
        .assert()
        .stdout(predicate::str::contains("/photos/albums/"));

    env.cmd().args(["rm", "/photos/albums/"]).assert().success();
    env.cmd().args(["exists", "/photos/albums"]).assert().code(1);
}

#[test]
fn test_exists_exit_codes() {
    let env = Env::seeded();
    env.cmd().args(["exists", "/photos"]).assert().success();
    env.cmd().args(["exists", "/photos/2024/"]).assert().success();
    env.cmd().args(["exists", "/photos/2025"]).assert().code(1);
    env.cmd().args(["exists", "/other"]).assert().code(1);
}

// ============================================================================
// Copy and move
// ============================================================================

#[test]
fn test_cp_and_mv() {
    let env = Env::seeded();
    env.cmd()
        .args(["cp", "/photos/2024/beach.jpg", "/photos/copy.jpg"])
        .assert()
        .success();
    env.cmd()
        .args(["cp", "/photos/2024/beach.jpg", "/photos/copy.jpg"])
        .assert()
        .code(5);
    env.cmd()
        .args(["cp", "--replace", "/photos/2024/beach.jpg", "/photos/copy.jpg"])
        .assert()
        .success();

    env.cmd()
        .args(["mv", "/photos/copy.jpg", "/photos/moved.jpg"])
        .assert()
        .success();
    env.cmd().args(["exists", "/photos/copy.jpg"]).assert().code(1);
    env.cmd()
        .args(["cat", "/photos/moved.jpg"])
        .assert()
        .stdout("sand and sea");
}

#[test]
fn test_cp_directory_unsupported() {
    let env = Env::seeded();
    env.cmd()
        .args(["cp", "/photos/2024/", "/photos/2025/"])
        .assert()
        .code(7);
}

// ============================================================================
// Access
// ============================================================================

#[test]
fn test_access_by_identity() {
    let env = Env::seeded();
    env.cmd()
        .args(["--identity", "alice", "access", "/photos/2024/beach.jpg", "rw"])
        .assert()
        .success()
        .stdout("ok\n");
    env.cmd()
        .args(["--identity", "mallory", "access", "/photos/2024/beach.jpg", "r"])
        .assert()
        .code(4);
    env.cmd()
        .args(["--identity", "alice", "access", "/photos/2024/beach.jpg", "x"])
        .assert()
        .code(7);
}

#[test]
fn test_identity_from_config_file() {
    let env = Env::seeded();
    std::fs::write(
        env.dir.path().join("config.toml"),
        "identity = \"alice\"\ncache_ttl = \"5s\"\n",
    )
    .unwrap();
    env.cmd()
        .args(["access", "/photos", "r"])
        .assert()
        .success();
}

#[test]
fn test_bad_config_file() {
    let env = Env::seeded();
    let config = env.dir.path().join("bad.toml");
    std::fs::write(&config, "cache_ttl = 12 minutes").unwrap();
    env.cmd()
        .arg("--config")
        .arg(&config)
        .args(["ls", "/photos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

// ============================================================================
// Path algebra
// ============================================================================

#[test]
fn test_path_normalize() {
    Env::new()
        .cmd()
        .args(["path", "normalize", "/bucket/a/../../b"])
        .assert()
        .success()
        .stdout("/bucket/b\n");
}

#[test]
fn test_path_resolve() {
    Env::new()
        .cmd()
        .args(["path", "resolve", "/bucket/path/to/dir/", "child/xyz"])
        .assert()
        .success()
        .stdout("/bucket/path/to/dir/child/xyz\n");
}

#[test]
fn test_path_relativize_cross_bucket() {
    Env::new()
        .cmd()
        .args(["path", "relativize", "/one/a", "/two/a"])
        .assert()
        .code(2);
}

#[test]
fn test_path_parse() {
    Env::new()
        .cmd()
        .args(["path", "parse", "/bucket/a/b/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("key:       a/b/"))
        .stdout(predicate::str::contains("directory: true"));
}
