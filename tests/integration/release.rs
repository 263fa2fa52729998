use crate::common::{Route, TestServer};
use relaunch::config::LauncherSettings;
use relaunch::core::RelaunchError;
use relaunch::release::{ConfiguredSource, EndpointSource, GithubSource, ReleaseSource, VersionTag};
use serde_json::json;

fn client() -> reqwest::Client {
    reqwest::Client::builder().user_agent("relaunch-integration").build().unwrap()
}

#[tokio::test]
async fn test_endpoint_document() {
    let server = TestServer::start().await;
    server.route(
        "/latest",
        Route::json(json!({
            "latest_version": "1.0.1",
            "latest_version_uri": "https://cdn.example.com/app1.0.1.zip",
            "latest_version_patch_uri": "https://cdn.example.com/app1.0.1patch.zip",
            "latest_version_description_uri": "https://example.com/notes/1.0.1"
        })),
    );

    let source = EndpointSource::new(client(), server.url("/latest"));
    let release = source.latest().await.unwrap();

    assert_eq!(release.latest_version_tag, VersionTag::new("1.0.1"));
    assert_eq!(release.clean_artifact_uri, "https://cdn.example.com/app1.0.1.zip");
    assert_eq!(release.patch_artifact_uri, "https://cdn.example.com/app1.0.1patch.zip");
    assert_eq!(release.notes_uri.as_deref(), Some("https://example.com/notes/1.0.1"));

    let request = &server.requests()[0];
    assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
}

#[tokio::test]
async fn test_endpoint_missing_field_is_decode_error() {
    let server = TestServer::start().await;
    server.route("/latest", Route::json(json!({ "latest_version": "1.0.1" })));

    let err = EndpointSource::new(client(), server.url("/latest")).latest().await.unwrap_err();
    assert!(matches!(err, RelaunchError::ReleaseDecodeFailed { .. }));
}

#[tokio::test]
async fn test_endpoint_garbage_is_decode_error() {
    let server = TestServer::start().await;
    server.route("/latest", Route::ok("<html>maintenance</html>"));

    let err = EndpointSource::new(client(), server.url("/latest")).latest().await.unwrap_err();
    assert!(matches!(err, RelaunchError::ReleaseDecodeFailed { .. }));
}

#[tokio::test]
async fn test_endpoint_server_error_is_check_failure() {
    let server = TestServer::start().await;
    server.route("/latest", Route::status(500));

    let err = EndpointSource::new(client(), server.url("/latest")).latest().await.unwrap_err();
    match err {
        RelaunchError::VersionCheckFailed {
            source_uri,
            reason,
        } => {
            assert_eq!(source_uri, server.url("/latest"));
            assert!(reason.contains("500"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_github_latest_release() {
    let server = TestServer::start().await;
    server.route(
        "/api/repos/acme/game/releases/latest",
        Route::json(json!({ "tag_name": "v2.1.0", "name": "Spring update", "draft": false })),
    );

    let source = GithubSource::new(client(), "acme", "game", "Game")
        .with_api_base(&format!("{}/api", server.base_url()))
        .with_web_base(&server.base_url());
    let release = source.latest().await.unwrap();

    assert_eq!(release.latest_version_tag.as_str(), "v2.1.0");
    assert_eq!(
        release.clean_artifact_uri,
        server.url("/acme/game/releases/download/v2.1.0/Gamev2.1.0.zip")
    );
    assert_eq!(
        release.patch_artifact_uri,
        server.url("/acme/game/releases/download/v2.1.0/Gamev2.1.0patch.zip")
    );
    assert_eq!(release.notes_uri, Some(server.url("/acme/game/releases/tag/v2.1.0")));

    let request = &server.requests()[0];
    assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/vnd.github+json"));
    assert_eq!(request.headers.get("user-agent").map(String::as_str), Some("relaunch-integration"));
}

#[tokio::test]
async fn test_configured_source_prefers_endpoint() {
    let server = TestServer::start().await;
    server.route(
        "/latest",
        Route::json(json!({
            "latest_version": "3.0",
            "latest_version_uri": "a",
            "latest_version_patch_uri": "b"
        })),
    );

    let mut settings = LauncherSettings::new("2.0");
    settings.latest_version_uri = Some(server.url("/latest"));
    settings.github = Some("acme/game".to_string());

    let source = ConfiguredSource::from_settings(&settings, "Game", client()).unwrap();
    assert!(matches!(source, ConfiguredSource::Endpoint(_)));
    assert_eq!(source.latest().await.unwrap().latest_version_tag, VersionTag::new("3.0"));
    assert_eq!(server.paths(), vec!["/latest".to_string()]);
}
