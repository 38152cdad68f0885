//! Appliance endpoint tests using wiremock.
//!
//! These tests verify that KitchenClient, StatusPoller and ApplianceActions
//! talk to the /api/kitchen/appliances endpoints correctly over HTTP.

use std::sync::Arc;
use std::time::Duration;

use kitchenhub::actions::ApplianceActions;
use kitchenhub::cache::QueryCache;
use kitchenhub::client::KitchenClient;
use kitchenhub::config::ClientConfig;
use kitchenhub::error::{KitchenError, TransportError};
use kitchenhub::models::{ApplianceStatus, NewAppliance};
use kitchenhub::poller::{PollNotification, StatusPoller};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn snapshot(id: &str, status: &str, progress: u8, updated_at: &str) -> Value {
    json!({
        "id": id,
        "brand": "Anova",
        "model": "Precision Oven",
        "nickname": "Steam oven",
        "status": status,
        "processingProgress": progress,
        "uploadedAt": "2024-05-01T10:00:00Z",
        "updatedAt": updated_at,
        "manualFileName": "anova.pdf",
        "manualUrl": null,
        "statusDetail": null
    })
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_base_url(server.uri())
        .with_queued_interval(Duration::from_millis(1000))
        .with_processing_interval(Duration::from_millis(1000))
}

fn client_for(server: &MockServer) -> KitchenClient {
    KitchenClient::new(&config_for(server)).expect("valid config")
}

#[tokio::test]
async fn test_get_appliance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kitchen/appliances/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appliance": snapshot("a1", "processing", 45, "2024-05-01T10:01:00Z")
        })))
        .mount(&server)
        .await;

    let appliance = client_for(&server).get_appliance("a1").await.unwrap();
    assert_eq!(appliance.status, ApplianceStatus::Processing);
    assert_eq!(appliance.progress, 45);
    assert_eq!(appliance.display_name(), "Steam oven");
}

#[tokio::test]
async fn test_get_appliance_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kitchen/appliances/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;

    let result = client_for(&server).get_appliance("missing").await;
    match result {
        Err(KitchenError::Transport(TransportError::Status { status, .. })) => {
            assert_eq!(status, 404)
        }
        other => panic!("Expected 404 status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_poller_follows_appliance_to_ready() {
    let server = MockServer::start().await;
    let url = "/api/kitchen/appliances/a1";
    for (status, progress, at) in [
        ("queued", 0, "2024-05-01T10:00:01Z"),
        ("processing", 60, "2024-05-01T10:00:02Z"),
    ] {
        Mock::given(method("GET"))
            .and(path(url))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "appliance": snapshot("a1", status, progress, at)
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(url))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appliance": snapshot("a1", "ready", 100, "2024-05-01T10:00:03Z")
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let cache = QueryCache::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let poller = StatusPoller::new(
        Arc::new(client_for(&server)),
        cache.clone(),
        config.poll_intervals,
        tx,
    )
    .unwrap();

    let handle = poller.observe("a1");
    tokio::time::timeout(Duration::from_secs(10), handle.stopped())
        .await
        .expect("poller should stop on ready");

    assert_eq!(cache.appliance("a1").unwrap().status, ApplianceStatus::Ready);
    // Baseline was the first fetch (queued), so the ready transition notifies
    let notification = rx.try_recv().expect("one notification");
    assert_eq!(
        notification,
        PollNotification::ManualReady {
            id: "a1".to_string(),
            name: "Steam oven".to_string(),
        }
    );
    assert_eq!(notification.message(), "Manual ready: Steam oven");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_create_and_delete_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/kitchen/appliances"))
        .and(body_json(json!({
            "brand": "Anova",
            "model": "Precision Oven",
            "nickname": "Steam oven",
            "manualFileName": "anova.pdf"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "appliance": snapshot("a7", "queued", 0, "2024-05-01T10:00:00Z")
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/kitchen/appliances/a7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let actions = ApplianceActions::new(client_for(&server), QueryCache::new());
    let input = NewAppliance {
        brand: "Anova".to_string(),
        model: "Precision Oven".to_string(),
        nickname: Some("Steam oven".to_string()),
        manual_file_name: "anova.pdf".to_string(),
    };

    let created = actions.create(&input).await.unwrap();
    assert_eq!(created.id, "a7");
    let list = actions.cache().appliances().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "a7");

    actions.delete("a7").await.unwrap();
    assert!(actions.cache().appliances().unwrap().is_empty());
    assert!(actions.cache().appliance("a7").is_none());
}

#[tokio::test]
async fn test_retry_failure_restores_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kitchen/appliances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appliances": [{
                "id": "a3",
                "brand": "Anova",
                "model": "Precision Oven",
                "status": "error",
                "processingProgress": 100,
                "uploadedAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:05:00Z",
                "statusDetail": "Unreadable PDF"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/kitchen/appliances/a3/retry"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let actions = ApplianceActions::new(client_for(&server), QueryCache::new());
    let list = actions.refresh_list().await.unwrap();
    assert_eq!(list[0].detail.as_deref(), Some("Unreadable PDF"));

    let err = actions.retry("a3").await.unwrap_err();
    assert!(err.is_retryable());
    let restored = actions.cache().appliance("a3").unwrap();
    assert_eq!(restored.status, ApplianceStatus::Error);
    assert_eq!(restored.detail.as_deref(), Some("Unreadable PDF"));
}
