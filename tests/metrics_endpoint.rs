#[path = "common/mod.rs"]
mod common;

use common::{completion_reply, spawn_app, start_mock_graph, start_mock_model, test_config, text_webhook};
use reqwest::{Client, StatusCode};
use wabridge::build_state;

// Smoke test for /metrics after a mix of routes.
#[tokio::test]
async fn metrics_count_routes_and_sends() {
    let (graph, _sent) = start_mock_graph(StatusCode::OK).await;
    let (model, _asked) = start_mock_model(StatusCode::OK, completion_reply("Hi!")).await;
    let state = build_state(test_config(&graph, &model)).unwrap();
    let (base, _h) = spawn_app(state).await;
    let client = Client::new();

    for payload in [
        text_webhook("pricing"),
        text_webhook("hello"),
        serde_json::json!({}),
    ] {
        client
            .post(format!("{}/webhook", base))
            .json(&payload)
            .send()
            .await
            .unwrap();
    }
    client
        .post(format!("{}/webhook", base))
        .body("garbage")
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{}/metrics", base)).send().await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/plain; version=0.0.4")
    );
    let text = resp.text().await.unwrap();
    assert!(text.contains("wabridge_webhooks_total 4"));
    assert!(text.contains("wabridge_route_total{route=\"pricing\"} 1"));
    assert!(text.contains("wabridge_route_total{route=\"general\"} 1"));
    assert!(text.contains("wabridge_route_total{route=\"none\"} 1"));
    assert!(text.contains("wabridge_route_total{route=\"invalid\"} 1"));
    // menu + lead questions, then model answer + CTA
    assert!(text.contains("wabridge_messages_sent_total 4"));
    assert!(text.contains("wabridge_completion_requests_total 1"));
    assert!(text.contains("wabridge_completion_failures_total 0"));
    assert!(text.contains("wabridge_webhook_latency_ms_bucket{le=\"+Inf\"} 4"));
    assert_eq!(text.matches("# HELP wabridge_route_total").count(), 1);
    assert!(text.contains("wabridge_process_uptime_seconds"));
}
