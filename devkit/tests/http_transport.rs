//! Heartbeats over real HTTP against the controller stub

use axum::http::StatusCode;
use refocus_collector::{
    Generator, HeartbeatResponse, HttpTransport, MetadataSnapshot, Reconciler, ResponseOutcome,
    TransportError,
};
use refocus_devkit::test_utils::{collector_config, names, TEST_COLLECTOR, TEST_TOKEN};
use refocus_devkit::{ControllerStub, GeneratorDir};
use serde_json::json;
use std::time::Duration;

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_heartbeat_reaches_controller() {
    let stub = ControllerStub::start(TEST_TOKEN).await.unwrap();
    let dir = GeneratorDir::new().unwrap();
    dir.write_generator("cpu", json!({"interval": 30})).unwrap();

    let config = collector_config(dir.path(), &stub.url(), TEST_TOKEN);
    let mut reconciler = Reconciler::new(config, transport());

    let report = reconciler.run_cycle(&MetadataSnapshot::new()).await.unwrap();

    assert!(report.outcome.is_applied());
    let received = stub.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].collector, TEST_COLLECTOR);
    assert_eq!(names(&received[0].payload.generators_added), vec!["cpu"]);
    assert_eq!(received[0].payload.timestamp, report.payload.timestamp);
    assert!(reconciler.state().generators.contains("cpu"));
}

#[tokio::test]
async fn test_url_with_trailing_slash() {
    let stub = ControllerStub::start(TEST_TOKEN).await.unwrap();
    let dir = GeneratorDir::new().unwrap();

    let url = format!("{}/", stub.url());
    let config = collector_config(dir.path(), &url, TEST_TOKEN);
    let mut reconciler = Reconciler::new(config, transport());

    let report = reconciler.run_cycle(&MetadataSnapshot::new()).await.unwrap();

    assert!(report.outcome.is_applied());
    assert_eq!(stub.received().len(), 1);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let stub = ControllerStub::start(TEST_TOKEN).await.unwrap();
    let dir = GeneratorDir::new().unwrap();
    dir.write_generator("cpu", json!({})).unwrap();

    let config = collector_config(dir.path(), &stub.url(), "not-the-token");
    let mut reconciler = Reconciler::new(config, transport());

    let report = reconciler.run_cycle(&MetadataSnapshot::new()).await.unwrap();

    match report.outcome {
        ResponseOutcome::Failed(TransportError::Status { status, .. }) => assert_eq!(status, 401),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(stub.received().is_empty());
    assert!(reconciler.state().generators.is_empty());
}

#[tokio::test]
async fn test_server_error_leaves_store_untouched() {
    let stub = ControllerStub::start(TEST_TOKEN).await.unwrap();
    stub.fail_with(StatusCode::INTERNAL_SERVER_ERROR);
    let dir = GeneratorDir::new().unwrap();
    dir.write_generator("cpu", json!({})).unwrap();

    let config = collector_config(dir.path(), &stub.url(), TEST_TOKEN);
    let mut reconciler = Reconciler::new(config, transport());

    let report = reconciler.run_cycle(&MetadataSnapshot::new()).await.unwrap();

    match report.outcome {
        ResponseOutcome::Failed(TransportError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(stub.received().len(), 1);
    assert!(reconciler.state().generators.is_empty());
    assert!(reconciler.state().last_heartbeat_time.is_some());
}

#[tokio::test]
async fn test_controller_response_is_applied() {
    let stub = ControllerStub::start(TEST_TOKEN).await.unwrap();
    stub.respond_with(HeartbeatResponse {
        generators_added: vec![Generator::new("pushed").with_field("interval", json!(60))],
        ..HeartbeatResponse::default()
    });
    let dir = GeneratorDir::new().unwrap();

    let config = collector_config(dir.path(), &stub.url(), TEST_TOKEN);
    let mut reconciler = Reconciler::new(config, transport());

    let report = reconciler.run_cycle(&MetadataSnapshot::new()).await.unwrap();

    assert!(report.payload.is_quiet());
    assert!(report.outcome.is_applied());
    let stored = reconciler.state().generators.get("pushed").unwrap();
    assert_eq!(stored.payload["interval"], json!(60));
}
