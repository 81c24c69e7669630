//! Prometheus metrics for the pulsecast relay
//!
//! This module provides metrics tracking for:
//! - Viewers: open connections, deliveries, pruned and dropped frames
//! - Scanner: cycles by outcome, cycle duration, envelopes by type
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

use crate::relay::broadcast::PublishReport;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all relay metrics
struct RelayMetrics {
    open_connections: Gauge,
    envelopes_published: CounterVec,
    deliveries: CounterVec,
    cycles: CounterVec,
    cycle_duration: Histogram,
}

/// Global storage for relay metrics; `None` when registration failed
static RELAY_METRICS: OnceLock<Option<RelayMetrics>> = OnceLock::new();

fn relay_metrics() -> Option<&'static RelayMetrics> {
    RELAY_METRICS.get().and_then(Option::as_ref)
}

// ============================================================================
// Initialization
// ============================================================================

fn register_relay_metrics() -> Result<RelayMetrics, prometheus::Error> {
    Ok(RelayMetrics {
        open_connections: register_gauge!(
            "pulsecast_open_connections",
            "Number of currently registered viewer connections"
        )?,
        envelopes_published: register_counter_vec!(
            "pulsecast_envelopes_published_total",
            "Envelopes published by type",
            &["type"]
        )?,
        deliveries: register_counter_vec!(
            "pulsecast_deliveries_total",
            "Per-connection delivery attempts by result",
            &["result"]
        )?,
        cycles: register_counter_vec!(
            "pulsecast_scan_cycles_total",
            "Scan cycles by outcome",
            &["outcome"]
        )?,
        cycle_duration: register_histogram!(
            "pulsecast_scan_cycle_duration_seconds",
            "Wall time of a scan cycle including pacing",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
    })
}

/// Initialize all Prometheus metrics
///
/// Registration happens at most once per process; later calls report the
/// result of the first one. If registration fails every recording function
/// stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = pulsecast::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let slot = RELAY_METRICS.get_or_init(|| match register_relay_metrics() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized successfully");
            Some(metrics)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus metrics registration failed");
            None
        }
    });

    if slot.is_some() {
        Ok(())
    } else {
        Err("Prometheus metrics registration failed".into())
    }
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    relay_metrics().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Update the open connection gauge
pub fn set_open_connections(count: usize) {
    if let Some(m) = relay_metrics() {
        m.open_connections.set(count as f64);
    }
}

/// Record the outcome of one broadcast
pub fn record_publish(kind: &str, report: &PublishReport) {
    let Some(m) = relay_metrics() else {
        return;
    };

    m.envelopes_published.with_label_values(&[kind]).inc();

    for (result, count) in [
        ("delivered", report.delivered),
        ("skipped", report.skipped),
        ("dropped", report.dropped),
        ("pruned", report.pruned),
    ] {
        if count > 0 {
            m.deliveries
                .with_label_values(&[result])
                .inc_by(count as f64);
        }
    }
}

/// Record a finished scan cycle
pub fn record_cycle(outcome: &str) {
    if let Some(m) = relay_metrics() {
        m.cycles.with_label_values(&[outcome]).inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a cycle timer
pub fn start_cycle_timer() -> MetricsTimer {
    match relay_metrics() {
        Some(m) => MetricsTimer::new(m.cycle_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
