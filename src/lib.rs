//! Core library for wabridge. This module wires the WhatsApp webhook
//! routes to the dispatcher, the outbound clients and the telemetry sink.
//!
//! The GET handshake echoes the challenge for the configured verify token.
//! The POST receiver always answers 200; failures after that point are
//! logged and counted, never returned.

mod config;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod outbound;
pub mod profile;
pub mod telemetry;
pub mod webhook;

pub use config::{AppConfig, ModelConfig, RotationConfig, WhatsAppConfig};
pub use dispatch::{DispatchReport, Dispatcher, Route};
pub use error::BridgeError;
pub use intent::{normalize, Intent, IntentMatcher};
pub use profile::BotProfile;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::metrics::BridgeMetrics;
use crate::outbound::{ChatCompletionClient, CompletionClient, GraphMessenger, MessageSender};
use crate::telemetry::{DispatchLogFields, RotatingWriter, TelemetrySink};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub verify_token: Option<Arc<str>>,
    pub dispatcher: Dispatcher,
    pub telemetry: TelemetrySink,
    pub metrics: Arc<BridgeMetrics>,
}

/// Build state with the reqwest-backed Graph and completion clients.
pub fn build_state(config: AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let sender: Arc<dyn MessageSender> = Arc::new(GraphMessenger::new(
        config.whatsapp.clone(),
        config.outbound_timeout_ms,
    )?);
    let model: Arc<dyn CompletionClient> = Arc::new(ChatCompletionClient::new(
        config.model.clone(),
        config.outbound_timeout_ms,
    )?);
    build_state_with(config, sender, model)
}

/// Build state around caller-supplied outbound clients.
pub fn build_state_with(
    config: AppConfig,
    sender: Arc<dyn MessageSender>,
    model: Arc<dyn CompletionClient>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let AppConfig {
        verify_token,
        profile,
        log_file,
        rotation,
        log_stdout,
        log_sample_n,
        ..
    } = config;

    // No default file is created; telemetry stays off unless LOG_FILE is set.
    let writer = match log_file.as_deref() {
        Some(path) => {
            match RotatingWriter::open(path, rotation.max_bytes, rotation.keep, rotation.compress) {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to open LOG_FILE; telemetry disabled");
                    None
                }
            }
        }
        None => {
            tracing::debug!("Telemetry disabled: LOG_FILE not set");
            None
        }
    };

    Ok(AppState {
        verify_token: verify_token.map(Arc::from),
        dispatcher: Dispatcher::new(profile, sender, model)?,
        telemetry: TelemetrySink::new(writer, log_stdout, log_sample_n),
        metrics: Arc::new(BridgeMetrics::new()),
    })
}

/// Build the Axum router and attach handlers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/webhook", get(verify_handler).post(receive_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters of the platform's subscription handshake.
#[derive(Debug, Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

fn handshake_accepted(params: &VerifyQuery, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    params.mode.as_deref() == Some("subscribe") && params.verify_token.as_deref() == Some(expected)
}

/// GET `/webhook`: echo `hub.challenge` when mode and token match exactly.
/// A query that does not decode (repeated keys, bad encoding) is refused
/// like any other mismatch.
async fn verify_handler(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Webhook verification failed: unreadable query");
            return StatusCode::FORBIDDEN.into_response();
        }
    };
    if handshake_accepted(&params, state.verify_token.as_deref()) {
        tracing::info!("Webhook verified");
        let challenge = params.challenge.unwrap_or_default();
        return (StatusCode::OK, challenge).into_response();
    }
    tracing::warn!(mode = ?params.mode, "Webhook verification failed");
    StatusCode::FORBIDDEN.into_response()
}

/// POST `/webhook`: answer the first inbound message. Always 200.
async fn receive_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let start = Instant::now();
    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "unreadable webhook body");
            finish(&state, start, "invalid", None, None);
            return StatusCode::OK;
        }
    };

    let message = match webhook::parse_inbound(&body) {
        Ok(Some(m)) => m,
        Ok(None) => {
            tracing::debug!("webhook without a message, acknowledging");
            finish(&state, start, "none", None, None);
            return StatusCode::OK;
        }
        Err(err) => {
            tracing::warn!(error = %err, bytes = body.len(), "malformed webhook payload");
            finish(&state, start, "invalid", None, None);
            return StatusCode::OK;
        }
    };

    let report = state.dispatcher.dispatch(&message).await;
    if let Some(err) = &report.error {
        tracing::error!(
            error = %err,
            route = report.route,
            replies_sent = report.replies_sent,
            "Error in webhook dispatch"
        );
    }
    state.metrics.record_dispatch(&report);
    finish(
        &state,
        start,
        report.route,
        Some(&report),
        message.id.as_deref(),
    );
    StatusCode::OK
}

/// Record latency and route metrics and emit one telemetry event.
fn finish(
    state: &AppState,
    start: Instant,
    route: &str,
    report: Option<&DispatchReport>,
    message_id: Option<&str>,
) {
    let latency_ms = start.elapsed().as_millis();
    state.metrics.record_webhook(route, latency_ms as u64);

    let outcome = report.map(DispatchReport::outcome).unwrap_or("ignored");
    let replies_sent = report.map(|r| r.replies_sent).unwrap_or(0);
    let event = serde_json::json!({
        "schemaVersion": 1,
        "ts": chrono::Utc::now().to_rfc3339(),
        "messageId": message_id,
        "route": route,
        "intent": report.and_then(|r| r.intent),
        "repliesSent": replies_sent,
        "deliveryFailures": report.map(|r| r.delivery_failures).unwrap_or(0),
        "modelUsed": report.is_some_and(|r| r.model_used),
        "outcome": outcome,
        "error": report.and_then(|r| r.error.as_ref()).map(|e| e.to_string()),
        "latencyMs": latency_ms,
    });
    state.telemetry.emit(
        &event,
        &DispatchLogFields {
            route,
            outcome,
            replies_sent,
            latency_ms,
        },
    );
}

async fn root_handler() -> &'static str {
    "Bot running"
}

/// Readiness summary for container health checks. Reports which credentials are
/// present, never their values.
async fn healthz_handler(State(state): State<AppState>) -> axum::response::Response {
    let profile = state.dispatcher.profile();
    let json = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "verifyTokenConfigured": state.verify_token.is_some(),
        "keywordCounts": {
            "pricing": profile.pricing_keywords.len(),
            "demo": profile.demo_keywords.len(),
            "support": profile.support_keywords.len(),
        },
        "uptimeSecs": state.metrics.uptime_secs(),
    });
    (StatusCode::OK, Json(json)).into_response()
}

/// Prometheus-style metrics exposition.
async fn metrics_handler(State(state): State<AppState>) -> axum::response::Response {
    let body = state.metrics.render(&state.telemetry);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
