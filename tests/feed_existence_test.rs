//! Integration tests for feed existence checks against an HTTP v3 feed

#![allow(clippy::all, clippy::unwrap_used, clippy::expect_used)]

use feedcheck::core::settings::{Settings, SETTINGS_FILE_NAME};
use feedcheck::core::MemorySink;
use feedcheck::{FeedError, Feed, ProjectToPublish, RegistryContext, RegistryLogger};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// "ci:secret"
const BASIC_CI_SECRET: &str = "Basic Y2k6c2VjcmV0";

fn service_index(server: &MockServer) -> serde_json::Value {
    json!({
        "version": "3.0.0",
        "resources": [
            {"@id": format!("{}/query", server.uri()), "@type": "SearchQueryService"},
            {"@id": format!("{}/flat/", server.uri()), "@type": "PackageBaseAddress/3.0.0"}
        ]
    })
}

/// Build a context from a settings file written into a temp dir
fn context_with_settings(settings_toml: &str) -> (TempDir, Arc<RegistryContext>) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(SETTINGS_FILE_NAME);
    std::fs::write(&path, settings_toml).unwrap();

    let settings = Settings::load_files(&[path]).unwrap();
    let logger = Arc::new(RegistryLogger::new(Arc::new(MemorySink::new())));
    let context = RegistryContext::from_settings(settings, logger, Vec::new()).unwrap();
    (temp_dir, Arc::new(context))
}

fn anonymous_context() -> (TempDir, Arc<RegistryContext>) {
    context_with_settings("")
}

fn projects(names: &[&str]) -> Vec<ProjectToPublish> {
    names.iter().map(|n| ProjectToPublish::new(*n)).collect()
}

async fn mount_anonymous_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(server)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/a/index.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"versions": ["0.9.0", "1.0.0"]})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/b/index.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partition_against_http_feed() {
    let server = MockServer::start().await;
    mount_anonymous_feed(&server).await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();
    let candidates = projects(&["A", "B"]);

    feed.check_existence(&candidates, "1.0.0").await.unwrap();

    assert_eq!(feed.packages_to_publish(), &projects(&["B"])[..]);
    assert_eq!(feed.already_published_count(), 1);
    assert_eq!(
        feed.describe_status(&candidates),
        "internal: B must be pushed\ninternal: A already pushed"
    );
}

#[tokio::test]
async fn test_version_not_yet_on_feed() {
    let server = MockServer::start().await;
    mount_anonymous_feed(&server).await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();
    let candidates = projects(&["A", "B"]);

    feed.check_existence(&candidates, "1.1.0").await.unwrap();
    assert_eq!(
        feed.describe_status(&candidates),
        "internal: all 2 packages must be pushed"
    );
}

#[tokio::test]
async fn test_service_index_is_fetched_once_per_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(&server)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/a/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"versions": ["1.0.0"]})))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let candidates = projects(&["A"]);

    // Two feed instances for the same registry share the context cache
    for name in ["first", "second"] {
        let feed = Feed::new(name, &url, context.clone()).unwrap();
        feed.check_existence(&candidates, "1.0.0").await.unwrap();
        assert_eq!(feed.already_published_count(), 1);
    }
}

#[tokio::test]
async fn test_unauthorized_feed_uses_configured_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .and(header("authorization", BASIC_CI_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(&server)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/a/index.json"))
        .and(header("authorization", BASIC_CI_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"versions": ["1.0.0"]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic realm=\"feed\""),
        )
        .mount(&server)
        .await;

    let url = format!("{}/v3/index.json", server.uri());
    let (_dir, context) = context_with_settings(&format!(
        r#"
[[sources]]
name = "internal"
url = "{}"

[sources.credentials]
username = "ci"
password = "secret"
"#,
        url
    ));

    let feed = Feed::new("internal", &url, context).unwrap();
    feed.check_existence(&projects(&["A"]), "1.0.0").await.unwrap();
    assert_eq!(feed.already_published_count(), 1);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried_forever() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic realm=\"feed\""),
        )
        .expect(2)
        .mount(&server)
        .await;

    let url = format!("{}/v3/index.json", server.uri());
    let (_dir, context) = context_with_settings(&format!(
        r#"
[[sources]]
name = "internal"
url = "{}/"

[sources.credentials]
username = "ci"
password = "wrong"
"#,
        url
    ));

    let feed = Feed::new("internal", &url, context).unwrap();
    let result = feed.check_existence(&projects(&["A"]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::Unauthorized(_))));
}

#[tokio::test]
async fn test_non_basic_challenge_fails_without_sending_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Bearer realm=\"feed\""),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/v3/index.json", server.uri());
    let (_dir, context) = context_with_settings(&format!(
        r#"
[[sources]]
name = "internal"
url = "{}"

[sources.credentials]
username = "ci"
password = "secret"
"#,
        url
    ));

    let feed = Feed::new("internal", &url, context).unwrap();
    let result = feed.check_existence(&projects(&["A"]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::Unauthorized(_))));
}

#[tokio::test]
async fn test_missing_credentials_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();

    let result = feed.check_existence(&projects(&["A"]), "1.0.0").await;
    let err = result.unwrap_err();
    assert!(err.is_remote_failure());
    assert!(matches!(err, FeedError::Unauthorized(_)));
}

#[tokio::test]
async fn test_server_error_aborts_the_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(&server)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/a/index.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/b/index.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();

    let result = feed.check_existence(&projects(&["A", "B"]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::Network(_))));
    assert!(feed.partition().is_none());
}

#[tokio::test]
async fn test_malformed_service_index_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();

    let result = feed.check_existence(&projects(&["A"]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::Protocol(_))));
}

#[tokio::test]
async fn test_bounded_concurrency_keeps_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(&server)))
        .mount(&server)
        .await;
    for (id, delay_ms) in [("a", 120u64), ("b", 10), ("c", 60), ("d", 0)] {
        Mock::given(method("GET"))
            .and(path(format!("/flat/{}/index.json", id)))
            .respond_with(
                ResponseTemplate::new(404).set_delay(std::time::Duration::from_millis(delay_ms)),
            )
            .mount(&server)
            .await;
    }

    let (_dir, context) = anonymous_context();
    let url = format!("{}/v3/index.json", server.uri());
    let feed = Feed::new("internal", &url, context).unwrap();
    let candidates = projects(&["a", "b", "c", "d"]);

    feed.check_existence_with_concurrency(&candidates, "3.0.0", 4)
        .await
        .unwrap();
    assert_eq!(feed.packages_to_publish(), &candidates[..]);
}

#[tokio::test]
async fn test_credentials_stay_on_the_source_origin() {
    let index_server = MockServer::start().await;
    let content_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .and(header("authorization", BASIC_CI_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "3.0.0",
            "resources": [
                {"@id": format!("{}/flat/", content_server.uri()), "@type": "PackageBaseAddress/3.0.0"}
            ]
        })))
        .mount(&index_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Basic realm=\"feed\""),
        )
        .mount(&index_server)
        .await;

    // Mounted first so any credentialed request fails the pass
    Mock::given(method("GET"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&content_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/a/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"versions": ["1.0.0"]})))
        .expect(1)
        .mount(&content_server)
        .await;

    let url = format!("{}/v3/index.json", index_server.uri());
    let (_dir, context) = context_with_settings(&format!(
        r#"
[[sources]]
name = "internal"
url = "{}"

[sources.credentials]
username = "ci"
password = "secret"
"#,
        url
    ));

    let feed = Feed::new("internal", &url, context).unwrap();
    feed.check_existence(&projects(&["A"]), "1.0.0").await.unwrap();
    assert_eq!(feed.already_published_count(), 1);
}

#[tokio::test]
async fn test_canceled_context_stops_folder_feed_check() {
    let feed_dir = TempDir::new().unwrap();
    std::fs::write(feed_dir.path().join("a.1.0.0.nupkg"), b"package").unwrap();

    let (_dir, context) = anonymous_context();
    context.cancellation().cancel();
    let feed = Feed::new("local", feed_dir.path().to_str().unwrap(), context).unwrap();

    let result = feed.check_existence(&projects(&["a"]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::Canceled)));
    assert!(feed.partition().is_none());
    assert_eq!(feed.describe_status(&projects(&["a"])), "local: existence not checked yet");
}

#[tokio::test]
async fn test_folder_feed_rejects_ids_escaping_the_folder() {
    let root = TempDir::new().unwrap();
    let feed_dir = root.path().join("feed");
    std::fs::create_dir_all(&feed_dir).unwrap();
    // Would be found as feed/../1.0.0 if the id were used as a path
    std::fs::create_dir_all(root.path().join("1.0.0")).unwrap();

    let (_dir, context) = anonymous_context();
    let feed = Feed::new("local", feed_dir.to_str().unwrap(), context).unwrap();

    let result = feed.check_existence(&projects(&[".."]), "1.0.0").await;
    assert!(matches!(result, Err(FeedError::InvalidArgument(_))));
    assert!(feed.partition().is_none());
}
