//! Unified error handling for the pulsecast crate
//!
//! Domain errors live next to the code that raises them ([`SourceError`] in
//! the source module, [`DeliveryError`] in the relay registry). This module
//! gathers them into a single [`Error`] for the server entry points and
//! provides the [`PulsecastErrorTrait`] used to pick a handling strategy.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulsecast::error::PulsecastErrorTrait;
//!
//! if err.is_recoverable() {
//!     tracing::warn!(category = ?err.category(), "retrying on next cycle");
//! }
//! ```

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

pub use crate::relay::registry::DeliveryError;
pub use crate::source::SourceError;

/// Common trait for all pulsecast error types
pub trait PulsecastErrorTrait: std::error::Error {
    /// Whether the failing operation can succeed later without intervention
    fn is_recoverable(&self) -> bool;

    /// The error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Insight source unreachable or misbehaving
    Upstream,
    /// Sending to a viewer failed
    Delivery,
    /// Invalid configuration
    Config,
    /// Listener or HTTP server failures
    Server,
    /// Encoding/decoding failures
    Serialization,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Delivery => "delivery",
            Self::Config => "config",
            Self::Server => "server",
            Self::Serialization => "serialization",
        }
    }
}

/// Unified error type for the pulsecast crate
#[derive(Error, Debug)]
pub enum Error {
    /// Insight source errors
    #[error("Insight source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Failed to bind the listener
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// HTTP server stopped with an error
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PulsecastErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::Bind { .. } => false,
            Self::Serve(_) => false,
            Self::Json(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Source(e) => e.category(),
            Self::Config(_) => ErrorCategory::Config,
            Self::Bind { .. } | Self::Serve(_) => ErrorCategory::Server,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }
}

/// Result type alias using the unified Error
pub type Result<T> = std::result::Result<T, Error>;
