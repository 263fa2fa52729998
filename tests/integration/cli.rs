//! Tests for the `relaunch` binary.
//!
//! The binary reads the section named after its own stem, `[relaunch]`, from
//! the file passed with `--config`.

use crate::common::{Route, TestServer};
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("launcher.toml");
    fs::write(&path, format!("# test launcher\n[relaunch]\n{body}")).unwrap();
    path
}

fn relaunch() -> Command {
    let mut cmd = Command::cargo_bin("relaunch").unwrap();
    cmd.env("RELAUNCH_NO_PROGRESS", "1").env_remove("RELAUNCH_CONFIG").env("RUST_LOG", "warn");
    cmd
}

/// Runs the binary off the async runtime so the test server keeps serving.
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap()
}

#[test]
fn test_help_lists_public_commands() {
    relaunch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("notes"))
        .stdout(predicate::str::contains("purge").not());
}

#[test]
fn test_status_shows_configuration() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        "current_version = \"1.4.2\"\ngithub = \"acme/game\"\nproject_name = \"Acme Game\"\nauxiliary_files = [\"relaunch.dll\"]\n",
    );

    relaunch()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme Game"))
        .stdout(predicate::str::contains("1.4.2"))
        .stdout(predicate::str::contains("github.com/acme/game"))
        .stdout(predicate::str::contains("relaunch.dll"));
}

#[test]
fn test_missing_config_fails_with_suggestion() {
    let temp = TempDir::new().unwrap();

    relaunch()
        .arg("--config")
        .arg(temp.path().join("nope.toml"))
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "current_version = \"1.0\"\n");

    relaunch()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("latest_version_uri or github"));
}

#[test]
fn test_notes_for_installed_version() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "current_version = \"v3\"\ngithub = \"acme/game\"\n");

    relaunch()
        .arg("--config")
        .arg(&config)
        .arg("notes")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://github.com/acme/game/releases/tag/v3"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_check_reports_new_version() {
    let server = TestServer::start().await;
    server.route(
        "/latest",
        Route::json(json!({
            "latest_version": "2.0.0",
            "latest_version_uri": server.url("/relaunch2.0.0.zip"),
            "latest_version_patch_uri": server.url("/relaunch2.0.0patch.zip"),
            "latest_version_description_uri": server.url("/notes/2.0.0")
        })),
    );
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &format!("current_version = \"1.0.0\"\nlatest_version_uri = \"{}\"\n", server.url("/latest")),
    );

    let mut cmd = relaunch();
    cmd.arg("--config").arg(&config).arg("check");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Version 2.0.0 is available (installed: 1.0.0)."));

    let mut cmd = relaunch();
    cmd.arg("--config").arg(&config).args(["notes", "--latest"]);
    run(cmd).await.success().stdout(predicate::str::contains(server.url("/notes/2.0.0")));

    assert!(server.paths().iter().all(|p| p == "/latest"));
    assert!(fs::read_to_string(&config).unwrap().contains("current_version = \"1.0.0\""));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_check_up_to_date() {
    let server = TestServer::start().await;
    server.route(
        "/latest",
        Route::json(json!({
            "latest_version": "1.0.0",
            "latest_version_uri": "unused",
            "latest_version_patch_uri": "unused"
        })),
    );
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &format!("current_version = \"1.0.0\"\nlatest_version_uri = \"{}\"\n", server.url("/latest")),
    );

    let mut cmd = relaunch();
    cmd.arg("--config").arg(&config).arg("update");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Congratulations, you are on the latest version."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_check_failure_exits_nonzero() {
    let server = TestServer::start().await;
    server.route("/latest", Route::status(500));
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &format!("current_version = \"1.0.0\"\nlatest_version_uri = \"{}\"\n", server.url("/latest")),
    );

    let mut cmd = relaunch();
    cmd.arg("--config").arg(&config).arg("check");
    run(cmd)
        .await
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to retrieve latest version"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_purge_deletes_queued_files() {
    let temp = TempDir::new().unwrap();
    let exe_old = temp.path().join("Launcher.exe.old");
    let dll_old = temp.path().join("Launcher.dll.old");
    fs::write(&exe_old, "old").unwrap();
    fs::write(&dll_old, "old").unwrap();

    relaunch()
        .args(["purge", "--wait-ms", "10"])
        .arg(&exe_old)
        .arg(&dll_old)
        .arg(temp.path().join("already-gone.old"))
        .assert()
        .success();

    assert!(!exe_old.exists());
    assert!(!dll_old.exists());
}

#[test]
#[serial]
fn test_config_path_from_environment() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "current_version = \"9.9\"\ngithub = \"acme/game\"\n");

    relaunch()
        .env("RELAUNCH_CONFIG", &config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("9.9"));
}
