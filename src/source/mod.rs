//! Insight sources
//!
//! The scanner never knows how insights are produced. It talks to an
//! [`InsightSource`], which yields the latest batch of findings and a
//! statistics record. [`HttpInsightSource`] is the production implementation
//! that reads both from an upstream research service.

pub mod http;

use async_trait::async_trait;

use crate::error::{ErrorCategory, PulsecastErrorTrait};
use crate::models::{Insight, Stats};

pub use http::HttpInsightSource;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised by an insight source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// Source temporarily unavailable
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Invalid source configuration
    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
}

impl PulsecastErrorTrait for SourceError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidConfig(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Serialization,
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Upstream,
        }
    }
}

/// Producer of insights and statistics
///
/// Implementations must be cheap to share: the scanner, the stats endpoint
/// and the CLI all hold the same `Arc<dyn InsightSource>`.
#[async_trait]
pub trait InsightSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Latest findings, in presentation order
    async fn latest_insights(&self) -> SourceResult<Vec<Insight>>;

    /// Aggregate statistics, passed through to callers unmodified
    async fn stats(&self) -> SourceResult<Stats>;
}
