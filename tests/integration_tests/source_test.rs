//! HTTP insight source tests against a mock upstream
//!
//! 1. Both accepted `/insights` shapes
//! 2. Bearer credential forwarding
//! 3. Stats pass-through
//! 4. Upstream to viewer, end to end

use pulsecast::config::SourceConfig;
use pulsecast::source::{HttpInsightSource, InsightSource};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{INSIGHTS_ARRAY, INSIGHTS_MIXED_TITLES, INSIGHTS_WRAPPED, STATS};
use crate::common::{next_envelope, test_config, TestRelay};

fn source_for(server: &MockServer, api_key: Option<&str>) -> HttpInsightSource {
    HttpInsightSource::new(&SourceConfig {
        base_url: server.uri(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
    })
    .unwrap()
}

async fn mount_json(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_insights_array() {
    let server = MockServer::start().await;
    mount_json(&server, "/insights", INSIGHTS_ARRAY).await;

    let insights = source_for(&server, None).latest_insights().await.unwrap();

    assert_eq!(insights.len(), 2);
    assert_eq!(insights[0].title(), Some("Sparse attention revisited"));
    assert_eq!(insights[1].get("stars"), Some(&serde_json::json!(1200)));
}

#[tokio::test]
async fn test_fetch_insights_wrapped() {
    let server = MockServer::start().await;
    mount_json(&server, "/insights", INSIGHTS_WRAPPED).await;

    let insights = source_for(&server, None).latest_insights().await.unwrap();

    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].title(), Some("Diffusion for tabular data"));
}

#[tokio::test]
async fn test_bearer_credential_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/insights"))
        .and(header("authorization", "Bearer research-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let insights = source_for(&server, Some("research-key"))
        .latest_insights()
        .await
        .unwrap();
    assert!(insights.is_empty());
}

#[tokio::test]
async fn test_stats_document_passed_through() {
    let server = MockServer::start().await;
    mount_json(&server, "/stats", STATS).await;

    let stats = source_for(&server, None).stats().await.unwrap();

    assert_eq!(stats.0["papersIndexed"], 4812);
    assert_eq!(stats.0["lastCrawl"], "2026-10-16T07:55:00Z");
}

#[tokio::test]
async fn test_upstream_insights_reach_viewer() {
    let upstream = MockServer::start().await;
    mount_json(&upstream, "/insights", INSIGHTS_ARRAY).await;
    mount_json(&upstream, "/stats", STATS).await;

    let relay = TestRelay::start(test_config(), Arc::new(source_for(&upstream, None))).await;
    let mut viewer = relay.connect_viewer().await;

    relay.trigger().await;

    let first = next_envelope(&mut viewer).await;
    let second = next_envelope(&mut viewer).await;
    assert_eq!(first["data"]["title"], "Sparse attention revisited");
    assert_eq!(first["data"]["source"], "arxiv");
    assert_eq!(second["data"]["stars"], 1200);

    let stats: serde_json::Value = reqwest::get(relay.url("/api/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["reposTracked"], 311);

    relay.stop().await;
}

#[tokio::test]
async fn test_records_forwarded_verbatim_whatever_their_title() {
    let upstream = MockServer::start().await;
    mount_json(&upstream, "/insights", INSIGHTS_MIXED_TITLES).await;

    let relay = TestRelay::start(test_config(), Arc::new(source_for(&upstream, None))).await;
    let mut viewer = relay.connect_viewer().await;

    let response = relay.trigger().await;
    assert_eq!(response["data"]["outcome"]["status"], "completed");
    assert_eq!(response["data"]["insights_published"], 4);

    let expected: Vec<serde_json::Value> = serde_json::from_str(INSIGHTS_MIXED_TITLES).unwrap();
    for record in expected {
        let thought = next_envelope(&mut viewer).await;
        assert_eq!(thought["type"], "thought");
        assert_eq!(thought["data"], record);
    }

    relay.stop().await;
}
