use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use pulsecast::metrics;
use pulsecast::relay::RelayServer;
use pulsecast::source::HttpInsightSource;

use super::load_config;

/// Command-line overrides for the relay server
pub struct ServeParams {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scan_interval_ms: Option<u64>,
    pub allowed_origin: Option<String>,
}

/// Start the relay server and run until Ctrl+C
pub async fn serve(params: ServeParams) -> Result<()> {
    let ServeParams {
        config,
        host,
        port,
        scan_interval_ms,
        allowed_origin,
    } = params;

    let mut config = load_config(config.as_deref())?;

    if host.is_some() || port.is_some() {
        let host = host.unwrap_or_else(|| config.server.bind_address.ip().to_string());
        let port = port.unwrap_or_else(|| config.server.bind_address.port());
        config.server.bind_address = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .context("Invalid bind address")?;
    }
    if let Some(interval) = scan_interval_ms {
        config.scan.interval_ms = interval;
    }
    if allowed_origin.is_some() {
        config.server.allowed_origin = allowed_origin;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics unavailable");
    }

    let source = HttpInsightSource::new(&config.source).context("Failed to create insight source")?;
    let server = RelayServer::new(config, Arc::new(source))?;

    println!("{}", server.info().display());
    println!();

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Relay server stopped.");
    Ok(())
}
