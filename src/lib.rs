//! pulsecast - Live insight relay
//!
//! Periodically pulls the latest research insights from an upstream service
//! and fans them out, paced and in order, to every connected WebSocket viewer.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Insights and the envelopes sent to viewers
//! - [`source`] - Upstream insight source (trait and HTTP client)
//! - [`relay`] - Connection registry, broadcast bus, HTTP and WebSocket API
//! - [`scanner`] - Scan cycles and their schedule
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulsecast::config::Config;
//! use pulsecast::relay::RelayServer;
//! use pulsecast::source::HttpInsightSource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let source = Arc::new(HttpInsightSource::new(&config.source)?);
//!     let server = RelayServer::new(config, source)?;
//!     server
//!         .start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod relay;
pub mod scanner;
pub mod source;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, OverlapPolicy};
    pub use crate::error::{Error, ErrorCategory, PulsecastErrorTrait, Result};
    pub use crate::models::{Envelope, EnvelopeKind, Insight, Stats};
    pub use crate::relay::{BroadcastBus, ConnectionRegistry, RelayServer};
    pub use crate::scanner::{CycleOutcome, CycleReport, ScanOrchestrator};
    pub use crate::source::{HttpInsightSource, InsightSource};
}

// Direct re-exports for convenience
pub use models::{Envelope, Insight};
