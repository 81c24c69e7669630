//! Live relay between the scan pipeline and connected viewers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │             Relay Server             │
//! │                                      │
//! │  ┌───────────────────────────────┐   │
//! │  │     Connection Registry       │   │
//! │  │  - add / remove / size        │   │
//! │  │  - snapshot for delivery      │   │
//! │  └───────────────────────────────┘   │
//! │                 ▲                    │
//! │  ┌──────────────┴────────────────┐   │
//! │  │        Broadcast Bus          │   │
//! │  │  - serialize once             │   │
//! │  │  - per-viewer isolation       │   │
//! │  └───────────────────────────────┘   │
//! │                                      │
//! │  ┌───────────────────────────────┐   │
//! │  │           HTTP API            │   │
//! │  │  GET  /ws                     │   │
//! │  │  GET  /api/health             │   │
//! │  │  GET  /api/stats              │   │
//! │  │  POST /api/scan/trigger       │   │
//! │  │  GET  /metrics                │   │
//! │  └───────────────────────────────┘   │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pulsecast::config::Config;
//! use pulsecast::relay::RelayServer;
//! use pulsecast::source::HttpInsightSource;
//!
//! let config = Config::from_env()?;
//! let source = Arc::new(HttpInsightSource::new(&config.source)?);
//! let server = RelayServer::new(config, source)?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod broadcast;
pub mod health;
pub mod registry;
pub mod server;
pub mod socket;

// Re-export main types
pub use broadcast::{BroadcastBus, PublishReport};
pub use health::{HealthReporter, HealthSnapshot};
pub use registry::{ChannelSink, Connection, ConnectionId, ConnectionRegistry, ViewerSink};
pub use server::{AppState, RelayServer, ServerInfo};
