//! Scan cycle orchestration
//!
//! One cycle fetches the latest insights and publishes them in order, one
//! `thought` envelope at a time, pausing between consecutive insights so
//! viewers see a steady stream. A failed fetch becomes a single `error`
//! envelope; a cycle never returns an error to its caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{OverlapPolicy, ScanConfig};
use crate::error::PulsecastErrorTrait;
use crate::metrics;
use crate::models::Envelope;
use crate::relay::broadcast::BroadcastBus;
use crate::source::InsightSource;

/// Message sent to viewers when the source cannot be reached
pub const RECONNECTING_MESSAGE: &str =
    "Lost contact with the research feed. Reconnecting on the next scan...";

// ============================================================================
// Cycle Report
// ============================================================================

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Every fetched insight was published
    Completed,
    /// The fetch failed and an error envelope was published
    SourceFailed { error: String },
    /// Another cycle was running and the policy is single-flight
    Skipped,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SourceFailed { .. } => "source_failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Summary of one cycle, returned to the trigger endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub insights_published: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

// ============================================================================
// Scan Orchestrator
// ============================================================================

/// Runs scan cycles against an insight source
pub struct ScanOrchestrator {
    source: Arc<dyn InsightSource>,
    bus: BroadcastBus,
    pacing: Duration,
    overlap: OverlapPolicy,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a single-flight cycle ends, even by panic
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanOrchestrator {
    pub fn new(source: Arc<dyn InsightSource>, bus: BroadcastBus, config: &ScanConfig) -> Self {
        Self {
            source,
            bus,
            pacing: config.pacing(),
            overlap: config.overlap,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &Arc<dyn InsightSource> {
        &self.source
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Whether a single-flight cycle is currently running
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle: fetch, then publish each insight with pacing
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let started = Instant::now();

        let _guard = match self.overlap {
            OverlapPolicy::Concurrent => None,
            OverlapPolicy::SingleFlight => {
                if self
                    .in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    tracing::info!("Scan cycle already in progress, skipping");
                    metrics::record_cycle(CycleOutcome::Skipped.as_str());
                    return CycleReport {
                        outcome: CycleOutcome::Skipped,
                        insights_published: 0,
                        started_at,
                        duration_ms: 0,
                    };
                }
                Some(FlightGuard(&self.in_flight))
            }
        };

        let _timer = metrics::start_cycle_timer();
        tracing::info!(source = self.source.name(), "Starting scan cycle");

        let (outcome, insights_published) = match self.source.latest_insights().await {
            Ok(insights) => {
                let total = insights.len();
                for (index, insight) in insights.into_iter().enumerate() {
                    tracing::info!(title = insight.title().unwrap_or("(untitled)"), position = index + 1, total, "Broadcasting insight");
                    self.bus.publish(&Envelope::thought(insight)).await;

                    if index + 1 < total {
                        tokio::time::sleep(self.pacing).await;
                    }
                }
                (CycleOutcome::Completed, total)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "Scan cycle failed to fetch insights"
                );
                self.bus.publish(&Envelope::error(RECONNECTING_MESSAGE)).await;
                (
                    CycleOutcome::SourceFailed {
                        error: e.to_string(),
                    },
                    0,
                )
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::record_cycle(outcome.as_str());
        tracing::info!(
            outcome = outcome.as_str(),
            insights_published,
            duration_ms,
            "Scan cycle finished"
        );

        CycleReport {
            outcome,
            insights_published,
            started_at,
            duration_ms,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
