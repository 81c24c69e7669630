//! Relay server implementation
//!
//! This module wires the registry, broadcast bus, scan orchestrator and
//! health reporter together and serves them over HTTP.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::api::create_router;
use super::broadcast::BroadcastBus;
use super::health::HealthReporter;
use super::registry::ConnectionRegistry;
use crate::config::{Config, OverlapPolicy};
use crate::error::{Error, Result};
use crate::scanner::{ScanOrchestrator, ScanSchedule, ScheduleConfig};
use crate::source::InsightSource;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
///
/// Built once per server; every handler sees the same registry and bus.
#[derive(Clone)]
pub struct AppState {
    /// Live viewer connections
    pub registry: Arc<ConnectionRegistry>,

    /// Fan-out over the registry
    pub bus: BroadcastBus,

    /// Fetch-then-broadcast cycles
    pub orchestrator: Arc<ScanOrchestrator>,

    /// Health reporting
    pub health: HealthReporter,

    /// Insight source, also used for stats pass-through
    pub source: Arc<dyn InsightSource>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn InsightSource>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let bus = BroadcastBus::new(registry.clone());
        let orchestrator = Arc::new(ScanOrchestrator::new(
            source.clone(),
            bus.clone(),
            &config.scan,
        ));
        let health = HealthReporter::new(registry.clone());

        Self {
            registry,
            bus,
            orchestrator,
            health,
            source,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Relay Server
// ============================================================================

/// Main relay server
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a new relay server
    pub fn new(config: Config, source: Arc<dyn InsightSource>) -> Result<Self> {
        config.validate().map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            state: AppState::new(config, source),
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    fn config(&self) -> &Config {
        &self.state.config
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Result<Router> {
        let server = &self.config().server;

        let allow_origin = match server.allowed_origin.as_deref() {
            None | Some("*") => AllowOrigin::from(Any),
            Some(origin) => {
                let value = HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|e| {
                    Error::Config(format!("Invalid allowed origin '{origin}': {e}"))
                })?;
                AllowOrigin::exact(value)
            }
        };
        let cors = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut router = create_router(self.state.clone()).layer(ServiceBuilder::new().layer(cors));

        if server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        Ok(router)
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// The scan schedule runs for exactly as long as the HTTP server.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.build_router()?;
        let addr = listener.local_addr().map_err(Error::Serve)?;

        tracing::info!(%addr, "Relay listening");

        let schedule = ScanSchedule::new(
            self.state.orchestrator.clone(),
            ScheduleConfig::from(&self.config().scan),
        )
        .start();

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(Error::Serve);

        schedule.shutdown().await;
        served?;

        tracing::info!("Relay server shutdown complete");
        Ok(())
    }

    /// Bind the configured address and serve with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = self.config().server.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        self.serve(listener, shutdown_signal).await
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        let config = self.config();
        ServerInfo {
            bind_address: config.server.bind_address,
            allowed_origin: config.server.allowed_origin.clone(),
            source: self.state.source.name().to_string(),
            scan_interval_ms: config.scan.interval_ms,
            initial_delay_ms: config.scan.initial_delay_ms,
            pacing_ms: config.scan.pacing_ms,
            overlap: config.scan.overlap,
            request_logging_enabled: config.server.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub allowed_origin: Option<String>,
    pub source: String,
    pub scan_interval_ms: u64,
    pub initial_delay_ms: u64,
    pub pacing_ms: u64,
    pub overlap: OverlapPolicy,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Pulsecast Relay\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Allowed Origin: {}\n\
             Source: {}\n\
             Scan Interval: {}ms (first scan after {}ms)\n\
             Pacing: {}ms\n\
             Overlap: {:?}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.allowed_origin.as_deref().unwrap_or("*"),
            self.source,
            self.scan_interval_ms,
            self.initial_delay_ms,
            self.pacing_ms,
            self.overlap,
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
