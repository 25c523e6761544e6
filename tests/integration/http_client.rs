use crate::support::TestServer;
use hoyofiles::config::ApiConfig;
use hoyofiles::error::ApiError;
use hoyofiles::manifest::{HttpManifestClient, ManifestClient};
use std::time::Duration;

const CATALOG: &str = r#"{
    "3.0": {"game": {"full": {"name": "GenshinImpact_3.0.0.zip", "url": "https://cdn/full-3.0.zip", "md5": "aa", "size": "1024"}}},
    "3.1": {"game": {"segments": [{"name": "seg1.zip", "url": "https://cdn/seg1.zip", "md5": "bb", "size": 2048}]},
            "decompressed_path": "https://cdn/3.1/unpacked"}
}"#;

fn client(base: &str, fallback: Option<&str>) -> HttpManifestClient {
    HttpManifestClient::new(&ApiConfig {
        base_url: base.to_string(),
        fallback_url: fallback.map(str::to_string),
        list_timeout_secs: 5,
        manifest_timeout_secs: 5,
        ..ApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn catalog_keeps_document_order() {
    let server = TestServer::start(vec![("/hk4e_versions.json", 200, CATALOG)]).await;
    let catalog = client(&server.base, None)
        .fetch_version_catalog("hk4e")
        .await
        .unwrap();

    assert_eq!(catalog.labels().collect::<Vec<_>>(), vec!["3.0", "3.1"]);
    assert_eq!(catalog.latest(), Some("3.1"));
    let full = catalog.get("3.0").unwrap().game.full.as_ref().unwrap();
    assert_eq!(full.size, 1024);
    assert_eq!(
        catalog.get("3.1").unwrap().decompressed_path.as_deref(),
        Some("https://cdn/3.1/unpacked")
    );
}

#[tokio::test]
async fn catalog_falls_back_once_and_sticks() {
    let primary = TestServer::start(vec![("/hk4e_versions.json", 500, "boom")]).await;
    let fallback = TestServer::start(vec![
        ("/hk4e_versions.json", 200, CATALOG),
        ("/hk4e/3.1/pkg_version", 200, "{\"remoteName\":\"a\",\"md5\":\"x\",\"fileSize\":1}\n"),
    ])
    .await;
    let client = client(&primary.base, Some(&fallback.base));

    let catalog = client.fetch_version_catalog("hk4e").await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(client.active_base(), fallback.base);

    client.fetch_version_catalog("hk4e").await.unwrap();
    client.fetch_manifest_payload("hk4e", "3.1", "pkg_version").await.unwrap();
    assert_eq!(primary.hits(), vec!["/hk4e_versions.json".to_string()]);
    assert_eq!(fallback.hits().len(), 3);
}

#[tokio::test]
async fn concurrent_catalog_failures_all_reach_fallback() {
    let primary = TestServer::start_with_delay(
        vec![
            ("/hk4e_versions.json", 500, "boom"),
            ("/nap_versions.json", 500, "boom"),
        ],
        Duration::from_millis(150),
    )
    .await;
    let fallback = TestServer::start(vec![
        ("/hk4e_versions.json", 200, CATALOG),
        ("/nap_versions.json", 200, CATALOG),
    ])
    .await;
    let client = client(&primary.base, Some(&fallback.base));

    // Both requests are in flight against the primary before either fails
    let (hk4e, nap) = tokio::join!(
        client.fetch_version_catalog("hk4e"),
        client.fetch_version_catalog("nap")
    );
    assert_eq!(hk4e.unwrap().len(), 2);
    assert_eq!(nap.unwrap().len(), 2);
    assert_eq!(primary.hits().len(), 2);
    assert_eq!(fallback.hits().len(), 2);
    assert_eq!(client.active_base(), fallback.base);
}

#[tokio::test]
async fn catalog_failure_without_fallback_surfaces() {
    let server = TestServer::start(vec![("/hk4e_versions.json", 503, "busy")]).await;
    let err = client(&server.base, None)
        .fetch_version_catalog("hk4e")
        .await
        .unwrap_err();
    match err {
        ApiError::Transport(message) => assert!(message.contains("HTTP 503")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_catalog_is_a_decode_error() {
    let server = TestServer::start(vec![("/nap_versions.json", 200, "{\"1.0\": ")]).await;
    let err = client(&server.base, None)
        .fetch_version_catalog("nap")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn manifest_is_not_retried() {
    let primary = TestServer::start(vec![]).await;
    let fallback = TestServer::start(vec![("/hk4e/5.0/pkg_version", 200, "")]).await;
    let client = client(&primary.base, Some(&fallback.base));

    let err = client
        .fetch_manifest_payload("hk4e", "5.0", "pkg_version")
        .await
        .unwrap_err();
    match err {
        ApiError::Transport(message) => assert!(message.contains("HTTP 404")),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(fallback.hits().is_empty());
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Nothing listens on the discard port
    let err = client("http://127.0.0.1:9", None)
        .fetch_version_catalog("hk4e")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
