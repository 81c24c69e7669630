//! HTTP API for the relay
//!
//! ```text
//! GET  /                  service description
//! GET  /ws                live viewer WebSocket
//! GET  /api/health        health snapshot
//! GET  /api/stats         insight source statistics
//! POST /api/scan/trigger  run one scan cycle now
//! GET  /metrics           Prometheus metrics
//! ```

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::health::health_check;
use super::server::AppState;
use super::socket::live_socket;
use crate::metrics;
use crate::scanner::{CycleOutcome, CycleReport};

// ============================================================================
// API Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Result of a manual scan
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    pub data: CycleReport,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the relay router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(live_socket))
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/api/scan/trigger", post(trigger_scan))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Root handler - service description
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "pulsecast",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "live": "GET /ws",
            "health": "GET /api/health",
            "stats": "GET /api/stats",
            "trigger": "POST /api/scan/trigger",
            "metrics": "GET /metrics"
        }
    }))
}

// ============================================================================
// Scan Handlers
// ============================================================================

/// Run one cycle and wait for it to finish
///
/// The cycle runs in its own task so a panic inside it becomes a 500 here
/// instead of tearing down the connection.
async fn trigger_scan(State(state): State<AppState>) -> Response {
    tracing::info!("Manual scan triggered");
    let orchestrator = state.orchestrator.clone();

    match tokio::spawn(async move { orchestrator.run_cycle().await }).await {
        Ok(report) => {
            let message = match report.outcome {
                CycleOutcome::Skipped => "Scan already in progress",
                _ => "Scan cycle completed",
            };
            (
                StatusCode::OK,
                Json(TriggerResponse {
                    success: true,
                    message: message.to_string(),
                    data: report,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Manual scan cycle aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Scan cycle aborted: {e}"))),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Stats Handlers
// ============================================================================

/// Source statistics, passed through verbatim
async fn get_stats(State(state): State<AppState>) -> Response {
    match state.source.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch source stats");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to encode metrics: {e}"))),
        )
            .into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================
