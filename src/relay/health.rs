//! Health reporting
//!
//! A read-only view of the relay: how many viewers are connected and how
//! long the process has been up.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::registry::ConnectionRegistry;
use super::server::AppState;

/// Health snapshot served by `GET /api/health`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Registered viewer connections
    pub connections: usize,
    /// Monotonic seconds since the reporter was created
    pub uptime_seconds: u64,
    /// Time the snapshot was taken
    pub last_scan_timestamp: DateTime<Utc>,
    pub version: &'static str,
}

/// Produces [`HealthSnapshot`]s
#[derive(Debug, Clone)]
pub struct HealthReporter {
    registry: Arc<ConnectionRegistry>,
    start_time: Instant,
}

impl HealthReporter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            start_time: Instant::now(),
        }
    }

    /// Uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Current view of the relay; never fails
    pub async fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            connections: self.registry.size().await,
            uptime_seconds: self.uptime_secs(),
            last_scan_timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Health endpoint handler, always 200
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.snapshot().await)
}
