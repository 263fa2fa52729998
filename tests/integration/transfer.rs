use crate::common::{Route, TestServer};
use relaunch::core::{Progress, ProgressCallback, RelaunchError};
use relaunch::transfer::{Destination, HttpTransfer, TransferChannel};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<Progress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (Arc::new(move |p| sink.lock().unwrap().push(p)), seen)
}

fn http() -> HttpTransfer {
    HttpTransfer::new("relaunch-integration").unwrap()
}

#[tokio::test]
async fn test_download_named_after_url_with_progress() {
    let server = TestServer::start().await;
    let body = vec![7u8; 200 * 1024];
    server.route("/files/app1.0.1patch.zip", Route::ok(body.clone()));
    let temp = TempDir::new().unwrap();
    let (callback, seen) = recorder();

    let path = http()
        .fetch(
            &server.url("/files/app1.0.1patch.zip"),
            &Destination::Directory(temp.path().join("Temp")),
            &CancellationToken::new(),
            Some(callback),
        )
        .await
        .unwrap();

    assert_eq!(path, temp.path().join("Temp/app1.0.1patch.zip"));
    assert_eq!(std::fs::read(&path).unwrap(), body);

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0].done < w[1].done));
    assert!(seen.iter().all(|p| p.total == body.len() as u64));
    assert_eq!(seen.last().unwrap().done, body.len() as u64);
}

#[tokio::test]
async fn test_content_disposition_names_the_file() {
    let server = TestServer::start().await;
    server.route(
        "/download?id=42",
        Route::ok(b"zip".to_vec()).header("Content-Disposition", "attachment; filename=\"Game 1.0.zip\""),
    );
    let temp = TempDir::new().unwrap();

    let path = http()
        .fetch(
            &server.url("/download?id=42"),
            &Destination::Directory(temp.path().to_path_buf()),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(path.file_name().unwrap(), "Game 1.0.zip");
}

#[tokio::test]
async fn test_hostile_content_disposition_stays_in_directory() {
    let server = TestServer::start().await;
    server.route(
        "/evil",
        Route::ok(b"x".to_vec()).header("Content-Disposition", "attachment; filename=\"../../evil.exe\""),
    );
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Temp");

    let path = http()
        .fetch(&server.url("/evil"), &Destination::Directory(dir.clone()), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(path.parent().unwrap(), dir);
    assert_eq!(path.file_name().unwrap(), "evil.exe");
}

#[tokio::test]
async fn test_explicit_file_destination() {
    let server = TestServer::start().await;
    server.route("/a.zip", Route::ok(b"abc".to_vec()));
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("nested/dir/renamed.bin");

    let path = http()
        .fetch(&server.url("/a.zip"), &Destination::File(target.clone()), &CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(path, target);
    assert_eq!(std::fs::read(&target).unwrap(), b"abc");
}

#[tokio::test]
async fn test_unknown_length_reports_zero_total() {
    let server = TestServer::start().await;
    server.route("/stream.zip", Route::ok(vec![1u8; 4096]).without_length());
    let temp = TempDir::new().unwrap();
    let (callback, seen) = recorder();

    let path = http()
        .fetch(
            &server.url("/stream.zip"),
            &Destination::Directory(temp.path().to_path_buf()),
            &CancellationToken::new(),
            Some(callback),
        )
        .await
        .unwrap();

    assert_eq!(std::fs::metadata(path).unwrap().len(), 4096);
    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(Progress::is_indeterminate));
    assert_eq!(seen.last().unwrap().done, 4096);
}

#[tokio::test]
async fn test_not_found_keeps_status() {
    let server = TestServer::start().await;
    let temp = TempDir::new().unwrap();

    let err = http()
        .fetch(
            &server.url("/missing.zip"),
            &Destination::Directory(temp.path().to_path_buf()),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RelaunchError::TransferFailed { status: Some(404), .. }));
    assert!(err.is_not_found());
    assert!(!temp.path().join("missing.zip").exists());
}

#[tokio::test]
async fn test_server_error_is_not_not_found() {
    let server = TestServer::start().await;
    server.route("/busy.zip", Route::status(503));
    let temp = TempDir::new().unwrap();

    let err = http()
        .fetch(
            &server.url("/busy.zip"),
            &Destination::Directory(temp.path().to_path_buf()),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RelaunchError::TransferFailed { status: Some(503), .. }));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_cancel_mid_transfer() {
    let server = TestServer::start().await;
    server.route("/slow.zip", Route::ok(vec![9u8; 64 * 1024]).slow(Duration::from_millis(20)));
    let temp = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let (callback, seen) = recorder();

    let trigger = cancel.clone();
    let watcher = Arc::clone(&seen);
    tokio::spawn(async move {
        while watcher.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        trigger.cancel();
    });

    let err = http()
        .fetch(
            &server.url("/slow.zip"),
            &Destination::Directory(temp.path().to_path_buf()),
            &cancel,
            Some(callback),
        )
        .await
        .unwrap_err();

    assert!(err.is_canceled());
    let done = seen.lock().unwrap().last().unwrap().done;
    assert!(done < 64 * 1024);
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = TestServer::start().await;
    server.route("/a.zip", Route::ok(b"a".to_vec()));
    let temp = TempDir::new().unwrap();

    http()
        .fetch(
            &server.url("/a.zip"),
            &Destination::Directory(temp.path().to_path_buf()),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].headers.get("user-agent").map(String::as_str), Some("relaunch-integration"));
}
