//! Configuration management for pulsecast
//!
//! Configuration is read once at startup, from environment variables or a
//! TOML file, and then passed by value to the server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP/WebSocket server configuration
    pub server: ServerConfig,

    /// Scan cadence configuration
    pub scan: ScanConfig,

    /// Insight source configuration
    pub source: SourceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_address: SocketAddr,

    /// Origin allowed to open live connections (any origin when unset)
    pub allowed_origin: Option<String>,

    /// Log every HTTP request
    pub enable_request_logging: bool,

    /// Frames buffered per viewer before new ones are dropped
    pub send_queue_capacity: usize,
}

/// How a cycle behaves when another one is still running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Cycles may interleave on the bus
    #[default]
    Concurrent,
    /// A cycle starting while another runs is skipped
    SingleFlight,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concurrent" => Ok(Self::Concurrent),
            "single-flight" | "single_flight" | "singleflight" => Ok(Self::SingleFlight),
            other => Err(format!(
                "Unknown overlap policy '{other}'. Expected concurrent or single-flight"
            )),
        }
    }
}

/// Scan cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Period of the scan timer in milliseconds
    pub interval_ms: u64,

    /// Delay of the one-shot first scan after startup in milliseconds
    pub initial_delay_ms: u64,

    /// Pause between two insights of one cycle in milliseconds
    pub pacing_ms: u64,

    /// Behaviour of overlapping cycles
    pub overlap: OverlapPolicy,
}

/// Insight source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the research service
    pub base_url: String,

    /// Bearer credential (optional)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3001)),
            allowed_origin: None,
            enable_request_logging: true,
            send_queue_capacity: 64,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            initial_delay_ms: 5_000,
            pacing_ms: 2_000,
            overlap: OverlapPolicy::Concurrent,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8000"),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl ScanConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {key} ('{raw}'): {e}")),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables on top of this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        let host = env_parse::<std::net::IpAddr>("PULSECAST_HOST")?;
        let port = match env_parse::<u16>("PULSECAST_PORT")? {
            Some(port) => Some(port),
            None => env_parse::<u16>("PORT")?,
        };
        if let Some(host) = host {
            self.server.bind_address.set_ip(host);
        }
        if let Some(port) = port {
            self.server.bind_address.set_port(port);
        }

        if let Ok(origin) = std::env::var("PULSECAST_ALLOWED_ORIGIN") {
            self.server.allowed_origin = Some(origin).filter(|o| !o.is_empty());
        }
        if let Some(capacity) = env_parse("PULSECAST_SEND_QUEUE")? {
            self.server.send_queue_capacity = capacity;
        }

        if let Some(interval) = env_parse("PULSECAST_SCAN_INTERVAL_MS")? {
            self.scan.interval_ms = interval;
        }
        if let Some(delay) = env_parse("PULSECAST_INITIAL_SCAN_DELAY_MS")? {
            self.scan.initial_delay_ms = delay;
        }
        if let Some(pacing) = env_parse("PULSECAST_PACING_MS")? {
            self.scan.pacing_ms = pacing;
        }
        if let Some(policy) = env_parse("PULSECAST_OVERLAP_POLICY")? {
            self.scan.overlap = policy;
        }

        if let Ok(url) = std::env::var("PULSECAST_SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Ok(key) = std::env::var("PULSECAST_SOURCE_API_KEY") {
            self.source.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(timeout) = env_parse("PULSECAST_SOURCE_TIMEOUT_SECS")? {
            self.source.timeout_secs = timeout;
        }

        if let Ok(level) = std::env::var("PULSECAST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PULSECAST_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scan.interval_ms == 0 {
            anyhow::bail!("scan.interval_ms must be greater than 0");
        }

        if self.scan.pacing_ms > self.scan.interval_ms {
            anyhow::bail!("scan.pacing_ms must not exceed scan.interval_ms");
        }

        if self.server.send_queue_capacity == 0 {
            anyhow::bail!("server.send_queue_capacity must be greater than 0");
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        url::Url::parse(&self.source.base_url)
            .with_context(|| format!("Invalid source.base_url: {}", self.source.base_url))?;

        Ok(())
    }
}
