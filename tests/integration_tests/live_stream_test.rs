//! Live stream integration tests
//!
//! Real viewers connect over WebSocket and a scan is triggered over HTTP:
//! 1. Welcome message on connect
//! 2. Thoughts arrive in upstream order, paced
//! 3. Every viewer receives every thought
//! 4. Health and stats endpoints

use chrono::DateTime;
use futures::SinkExt;
use pulsecast::scanner::RECONNECTING_MESSAGE;
use pulsecast::source::InsightSource;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{insight, next_envelope, test_config, Script, ScriptedSource, TestRelay};

fn relay_source(titles: &[&str]) -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::new(Script::Insights(
        titles.iter().map(|t| insight(t)).collect(),
    )))
}

async fn connections(relay: &TestRelay) -> u64 {
    let body: serde_json::Value = reqwest::get(relay.url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["connections"].as_u64().unwrap()
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[tokio::test]
async fn test_welcome_message_on_connect() {
    let relay = TestRelay::start(test_config(), relay_source(&[])).await;

    let (mut stream, _) = tokio_tungstenite::connect_async(relay.ws_url()).await.unwrap();
    let welcome = next_envelope(&mut stream).await;

    assert_eq!(welcome["type"], "system");
    assert!(welcome["message"].as_str().unwrap().starts_with("Connected"));
    assert!(welcome.get("data").is_none());
    assert!(DateTime::parse_from_rfc3339(welcome["timestamp"].as_str().unwrap()).is_ok());

    relay.stop().await;
}

#[tokio::test]
async fn test_health_tracks_viewers() {
    let relay = TestRelay::start(test_config(), relay_source(&[])).await;
    assert_eq!(connections(&relay).await, 0);

    let mut first = relay.connect_viewer().await;
    let _second = relay.connect_viewer().await;
    assert_eq!(connections(&relay).await, 2);

    first.send(Message::Close(None)).await.unwrap();

    let mut remaining = connections(&relay).await;
    for _ in 0..50 {
        if remaining == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = connections(&relay).await;
    }
    assert_eq!(remaining, 1);

    relay.stop().await;
}

// ============================================================================
// Scan Delivery
// ============================================================================

#[tokio::test]
async fn test_trigger_streams_thoughts_in_order() {
    let relay = TestRelay::start(test_config(), relay_source(&["A", "B"])).await;
    let mut viewer = relay.connect_viewer().await;

    let response = relay.trigger().await;
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["insights_published"], 2);

    let a = next_envelope(&mut viewer).await;
    let b = next_envelope(&mut viewer).await;

    assert_eq!(a["type"], "thought");
    assert_eq!(a["data"]["title"], "A");
    assert_eq!(a["data"]["summary"], "Summary of A");
    assert_eq!(b["type"], "thought");
    assert_eq!(b["data"]["title"], "B");

    let ta = DateTime::parse_from_rfc3339(a["timestamp"].as_str().unwrap()).unwrap();
    let tb = DateTime::parse_from_rfc3339(b["timestamp"].as_str().unwrap()).unwrap();
    assert!((tb - ta).num_milliseconds() >= 50);

    relay.stop().await;
}

#[tokio::test]
async fn test_every_viewer_receives_every_thought() {
    let relay = TestRelay::start(test_config(), relay_source(&["A", "B", "C"])).await;
    let mut viewers = vec![
        relay.connect_viewer().await,
        relay.connect_viewer().await,
        relay.connect_viewer().await,
    ];

    relay.trigger().await;

    for viewer in viewers.iter_mut() {
        let mut titles = Vec::new();
        for _ in 0..3 {
            titles.push(next_envelope(viewer).await["data"]["title"].clone());
        }
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    relay.stop().await;
}

#[tokio::test]
async fn test_source_failure_reaches_viewers_as_error() {
    let source = Arc::new(ScriptedSource::new(Script::Fail("connection refused".into())));
    let relay = TestRelay::start(test_config(), source.clone()).await;
    let mut viewer = relay.connect_viewer().await;

    let response = relay.trigger().await;
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["outcome"]["status"], "source_failed");

    let error = next_envelope(&mut viewer).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], RECONNECTING_MESSAGE);

    // Next scan recovers without any reconnect from the viewer
    source.set(Script::Insights(vec![insight("Recovered")]));
    relay.trigger().await;
    assert_eq!(next_envelope(&mut viewer).await["data"]["title"], "Recovered");

    relay.stop().await;
}

#[tokio::test]
async fn test_startup_scan_fires_without_trigger() {
    let mut config = test_config();
    config.scan.initial_delay_ms = 500;
    let source = relay_source(&["Boot"]);
    let relay = TestRelay::start(config, source.clone()).await;

    let mut viewer = relay.connect_viewer().await;
    let thought = next_envelope(&mut viewer).await;

    assert_eq!(thought["data"]["title"], "Boot");
    assert_eq!(source.fetches(), 1);

    relay.stop().await;
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn test_stats_endpoint_passes_through() {
    let source = relay_source(&[]);
    let relay = TestRelay::start(test_config(), source.clone()).await;

    let body: serde_json::Value = reqwest::get(relay.url("/api/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, source.stats().await.unwrap().0);

    relay.stop().await;
}
