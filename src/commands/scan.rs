use anyhow::{Context, Result};
use std::path::PathBuf;

use pulsecast::models::Envelope;
use pulsecast::source::{HttpInsightSource, InsightSource};

use super::load_config;

/// Fetch the latest insights once and print them as envelopes, one per line
pub async fn scan(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let source = HttpInsightSource::new(&config.source).context("Failed to create insight source")?;

    tracing::info!(base_url = source.base_url(), "Fetching latest insights");

    let insights = source
        .latest_insights()
        .await
        .with_context(|| format!("Failed to fetch insights from {}", source.base_url()))?;

    tracing::info!(count = insights.len(), "Fetched insights");

    for insight in insights {
        println!("{}", Envelope::thought(insight).to_frame()?);
    }

    Ok(())
}
