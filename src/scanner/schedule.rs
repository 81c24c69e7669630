//! Periodic scan schedule
//!
//! Fires a one-shot cycle shortly after startup, then one cycle per period.
//! Every cycle runs in its own task: a tick never waits for the previous
//! cycle, and a cycle that panics is logged without ending the schedule.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::orchestrator::ScanOrchestrator;
use crate::config::ScanConfig;

/// Timer settings for the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Period of the timer, counted from startup
    pub interval: Duration,
    /// Delay of the one-shot first cycle
    pub initial_delay: Duration,
}

impl From<&ScanConfig> for ScheduleConfig {
    fn from(config: &ScanConfig) -> Self {
        Self {
            interval: config.interval(),
            initial_delay: config.initial_delay(),
        }
    }
}

/// Handle to a running schedule
pub struct ScheduleHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Stop firing new cycles; cycles already running finish on their own
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Scan schedule task ended abnormally");
        }
        tracing::info!("Scan schedule stopped");
    }
}

/// Periodic driver of [`ScanOrchestrator::run_cycle`]
pub struct ScanSchedule {
    orchestrator: Arc<ScanOrchestrator>,
    config: ScheduleConfig,
}

impl ScanSchedule {
    pub fn new(orchestrator: Arc<ScanOrchestrator>, config: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Spawn the timer task
    pub fn start(self) -> ScheduleHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let ScheduleConfig {
            interval,
            initial_delay,
        } = self.config;
        let orchestrator = self.orchestrator;

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            initial_delay_ms = initial_delay.as_millis() as u64,
            "Starting scan schedule"
        );

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = tokio::time::interval_at(start + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let first = tokio::time::sleep_until(start + initial_delay);
            tokio::pin!(first);
            let mut first_fired = false;

            loop {
                tokio::select! {
                    _ = &mut first, if !first_fired => {
                        first_fired = true;
                        spawn_cycle(orchestrator.clone(), "startup");
                    }
                    _ = ticker.tick() => {
                        spawn_cycle(orchestrator.clone(), "timer");
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        ScheduleHandle { shutdown_tx, task }
    }
}

/// Run one cycle in its own task, containing any panic
pub fn spawn_cycle(orchestrator: Arc<ScanOrchestrator>, trigger: &'static str) {
    let cycle = tokio::spawn(async move { orchestrator.run_cycle().await });

    tokio::spawn(async move {
        match cycle.await {
            Ok(report) => {
                tracing::debug!(trigger, outcome = report.outcome.as_str(), "Scheduled cycle done");
            }
            Err(e) => {
                tracing::error!(trigger, error = %e, "Scheduled scan cycle aborted");
            }
        }
    });
}

// ============================================================================
// Tests
// ============================================================================
