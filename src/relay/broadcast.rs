//! Broadcast bus
//!
//! Serializes an envelope once and hands the same frame to every open
//! connection. Delivery is best effort and at most once: failures are
//! handled per connection and never stop the fan-out.

use serde::Serialize;
use std::sync::Arc;

use super::registry::ConnectionRegistry;
use crate::error::PulsecastErrorTrait;
use crate::metrics;
use crate::models::Envelope;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Connections the frame was handed to
    pub delivered: usize,
    /// Connections found closed at enumeration time
    pub skipped: usize,
    /// Connections whose queue was full; the frame was dropped for them
    pub dropped: usize,
    /// Connections removed because delivery failed
    pub pruned: usize,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.skipped + self.dropped + self.pruned
    }
}

/// Fan-out of envelopes to every registered viewer
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastBus {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver an envelope to every open connection
    pub async fn publish(&self, envelope: &Envelope) -> PublishReport {
        let frame = match envelope.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(kind = %envelope.kind, error = %e, "Failed to serialize envelope");
                return PublishReport::default();
            }
        };

        // Membership is captured up front so nothing is held across awaits
        let connections = self.registry.snapshot().await;
        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for connection in &connections {
            if !connection.is_open() {
                report.skipped += 1;
                failed.push(connection.id());
                continue;
            }

            match connection.deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_recoverable() => {
                    report.dropped += 1;
                    tracing::warn!(
                        connection_id = %connection.id(),
                        kind = %envelope.kind,
                        error = %e,
                        "Dropping frame for slow viewer"
                    );
                }
                Err(e) => {
                    report.pruned += 1;
                    failed.push(connection.id());
                    tracing::debug!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Delivery failed, deregistering connection"
                    );
                }
            }
        }

        for id in failed {
            self.registry.remove(id).await;
        }

        metrics::record_publish(envelope.kind.as_str(), &report);
        metrics::set_open_connections(self.registry.size().await);

        tracing::debug!(
            kind = %envelope.kind,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            pruned = report.pruned,
            "Envelope published"
        );

        report
    }
}

// ============================================================================
// Tests
// ============================================================================
