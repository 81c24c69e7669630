//! HTTP insight source
//!
//! Reads insights and statistics from an upstream research service:
//!
//! - `GET {base_url}/insights` returns a JSON array of insights, or an
//!   object with an `insights` array
//! - `GET {base_url}/stats` returns an arbitrary JSON document

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{InsightSource, SourceError, SourceResult};
use crate::config::SourceConfig;
use crate::models::{Insight, Stats};

/// Accepted shapes of the `/insights` response
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InsightsPayload {
    List(Vec<Insight>),
    Wrapped { insights: Vec<Insight> },
}

impl InsightsPayload {
    fn into_insights(self) -> Vec<Insight> {
        match self {
            Self::List(insights) | Self::Wrapped { insights } => insights,
        }
    }
}

/// Insight source backed by an HTTP research service
#[derive(Debug, Clone)]
pub struct HttpInsightSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInsightSource {
    /// Create a source from configuration
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| SourceError::InvalidConfig(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("pulsecast/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(format!("{url}: {e}")))
    }
}

#[async_trait]
impl InsightSource for HttpInsightSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn latest_insights(&self) -> SourceResult<Vec<Insight>> {
        let payload: InsightsPayload = self.get_json("/insights").await?;
        let insights = payload.into_insights();
        tracing::debug!(count = insights.len(), base_url = %self.base_url, "Fetched insights");
        Ok(insights)
    }

    async fn stats(&self) -> SourceResult<Stats> {
        self.get_json("/stats").await
    }
}
