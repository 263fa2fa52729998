use crate::common::{Route, TestServer};
use relaunch::core::RelaunchError;
use relaunch::orchestrator::{Orchestrator, Stage, Status};
use relaunch::release::EndpointSource;
use relaunch::replace::DisposalStrategy;
use relaunch::test_utils::{AppTree, ZipFixture};
use relaunch::transfer::HttpTransfer;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type HttpOrchestrator = Orchestrator<EndpointSource, HttpTransfer>;

fn publish(server: &TestServer, tag: &str) {
    server.route(
        "/latest",
        Route::json(json!({
            "latest_version": tag,
            "latest_version_uri": server.url(&format!("/files/app{tag}.zip")),
            "latest_version_patch_uri": server.url(&format!("/files/app{tag}patch.zip")),
            "latest_version_description_uri": server.url(&format!("/notes/{tag}"))
        })),
    );
}

fn orchestrator(server: &TestServer, tree: &AppTree, strategy: DisposalStrategy) -> HttpOrchestrator {
    let http = HttpTransfer::new("relaunch-integration").unwrap();
    let source = EndpointSource::new(http.client().clone(), server.url("/latest"));
    Orchestrator::new(source, http, tree.replacer(strategy), tree.options())
}

#[tokio::test]
async fn test_patch_update_over_http() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    server.route("/files/app1.0.1patch.zip", Route::ok(tree.full_release("1.0.1").to_bytes()));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);

    let check = orch.start_check().await.unwrap();
    assert_eq!(check.stage, Stage::Update);
    assert_eq!(check.message, "Version 1.0.1 is available (installed: 1.0.0).");

    let outcome = orch.start_update(false).await.unwrap();

    assert_eq!(outcome.stage, Stage::Done, "{}", outcome.message);
    assert!(outcome.error.is_none());
    assert_eq!(tree.read(&tree.exe()), "exe 1.0.1");
    assert_eq!(tree.read(&tree.dll()), "dll 1.0.1");
    assert_eq!(tree.recorded_version(), "1.0.1");
    assert!(!tree.scratch().exists());
    assert!(!tree.launcher_dir().join("app.exe.old").exists());
    assert!(orch.into_deletion_queue().is_empty());
    assert_eq!(
        server.paths(),
        vec!["/latest".to_string(), "/files/app1.0.1patch.zip".to_string()]
    );
}

#[tokio::test]
async fn test_up_to_date_skips_download() {
    let server = TestServer::start().await;
    let tree = AppTree::new("V1.0.1");
    publish(&server, "v1.0.1");
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);

    let outcome = orch.start_check().await.unwrap();

    assert_eq!(outcome.stage, Stage::Done);
    assert_eq!(server.paths(), vec!["/latest".to_string()]);
}

#[tokio::test]
async fn test_missing_patch_then_clean_install() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    server.route("/files/app1.0.1.zip", Route::ok(tree.full_release("1.0.1").to_bytes()));
    let orch = orchestrator(&server, &tree, DisposalStrategy::DeferredDelete);
    orch.start_check().await.unwrap();

    let patch = orch.start_update(false).await.unwrap();
    assert_eq!(patch.stage, Stage::Update);
    assert!(matches!(patch.error, Some(RelaunchError::ArtifactNotFound { clean_install: false, .. })));
    assert_eq!(tree.read(&tree.exe()), "old exe");

    let clean = orch.start_update(true).await.unwrap();
    assert_eq!(clean.stage, Stage::Done);
    assert_eq!(tree.read(&tree.exe()), "exe 1.0.1");

    let queue = orch.into_deletion_queue();
    assert_eq!(queue.paths.len(), 2);
    assert!(queue.paths.iter().all(|p| p.to_string_lossy().ends_with(".old")));
}

#[tokio::test]
async fn test_corrupt_archive_rolls_back() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    server.route("/files/app1.0.1patch.zip", Route::ok(b"this is not a zip archive".to_vec()));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);
    orch.start_check().await.unwrap();

    let outcome = orch.start_update(false).await.unwrap();

    assert_eq!(outcome.stage, Stage::Update);
    assert!(matches!(outcome.error, Some(RelaunchError::InstallFailed { .. })));
    assert_eq!(tree.read(&tree.exe()), "old exe");
    assert_eq!(tree.read(&tree.dll()), "old dll");
    assert!(!tree.launcher_dir().join("app.exe.old").exists());
    assert_eq!(tree.recorded_version(), "1.0.0");
}

#[tokio::test]
async fn test_cancel_slow_download() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    let padded = tree.full_release("1.0.1").file("data/big.bin", &vec![0u8; 128 * 1024]).to_bytes();
    server.route("/files/app1.0.1patch.zip", Route::ok(padded).slow(Duration::from_millis(10)));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);
    orch.start_check().await.unwrap();

    let (outcome, canceled) = tokio::join!(orch.start_update(false), async {
        loop {
            let status = orch.status();
            if status.stage == Stage::Cancel && status.download.done > 0 {
                break orch.cancel();
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    });
    let outcome = outcome.unwrap();

    assert!(canceled);
    assert_eq!(outcome.stage, Stage::Update);
    assert_eq!(outcome.message, "Update canceled.");
    assert!(!tree.scratch().exists());
    assert_eq!(tree.read(&tree.exe()), "old exe");
    assert_eq!(tree.recorded_version(), "1.0.0");
}

#[tokio::test]
async fn test_progress_snapshots_reach_listener() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    let archive = tree.full_release("1.0.1").to_bytes();
    let archive_len = archive.len() as u64;
    server.route("/files/app1.0.1patch.zip", Route::ok(archive));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);

    let seen = Arc::new(Mutex::new(Vec::<Status>::new()));
    let sink = Arc::clone(&seen);
    orch.subscribe(Arc::new(move |status: &Status| sink.lock().unwrap().push(status.clone())));

    orch.start_check().await.unwrap();
    orch.start_update(false).await.unwrap();

    let seen = seen.lock().unwrap();
    let stages: Vec<Stage> = seen.iter().map(|s| s.stage).collect();
    assert_eq!(stages.first(), Some(&Stage::Check));
    assert!(stages.contains(&Stage::Update));
    assert!(stages.contains(&Stage::Cancel));
    assert_eq!(stages.last(), Some(&Stage::Done));

    let last = seen.last().unwrap();
    assert_eq!(last.download.done, archive_len);
    assert_eq!(last.download.total, archive_len);
    assert_eq!(last.install.done, last.install.total);
    assert_eq!(last.install.total, 4);
}

#[tokio::test]
async fn test_check_failure_then_retry() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    server.route("/latest", Route::status(503));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);

    let failed = orch.start_check().await.unwrap();
    assert_eq!(failed.stage, Stage::Check);
    assert!(matches!(failed.error, Some(RelaunchError::VersionCheckFailed { .. })));

    publish(&server, "1.0.1");
    let retried = orch.start_check().await.unwrap();
    assert_eq!(retried.stage, Stage::Update);
}

#[tokio::test]
async fn test_archive_with_new_auxiliary_layout() {
    let server = TestServer::start().await;
    let tree = AppTree::new("1.0.0");
    publish(&server, "1.0.1");
    let patch = ZipFixture::new()
        .file("Launcher/app.exe", b"exe 1.0.1")
        .dir("plugins/")
        .file("plugins/extra.txt", b"plugin")
        .to_bytes();
    server.route("/files/app1.0.1patch.zip", Route::ok(patch));
    let orch = orchestrator(&server, &tree, DisposalStrategy::UnlinkNow);
    orch.start_check().await.unwrap();

    let outcome = orch.start_update(false).await.unwrap();

    assert_eq!(outcome.stage, Stage::Done);
    assert_eq!(tree.read(&tree.dll()), "old dll");
    assert_eq!(tree.read(&tree.root().join("plugins/extra.txt")), "plugin");
}
