use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::external::price_provider::{HistoricalPriceProvider, ProviderError};
use crate::models::PriceSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Yahoo Finance historical price provider for stocks and forex pairs.
/// No API key required.
pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; PortfolioTracker/0.1)")
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// One-day UTC window for the chart API, as seconds since the epoch.
fn day_window_epoch(day: NaiveDate) -> (i64, i64) {
    let start = day.and_time(NaiveTime::MIN).and_utc().timestamp();
    (start, start + 86_400)
}

#[async_trait]
impl HistoricalPriceProvider for YahooProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Yahoo
    }

    async fn fetch_daily_close(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> Result<Option<f64>, ProviderError> {
        let (period1, period2) = day_window_epoch(day);
        let url = format!("https://query1.finance.yahoo.com/v8/finance/chart/{}", symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            warn!("[Yahoo] No historical price for {} on {}", symbol, day);
            return Ok(None);
        }

        let body: YahooChartResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("[Yahoo] Unexpected response for {} on {}: {}", symbol, day, e);
                return Ok(None);
            }
        };

        let close = body
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.indicators.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().next())
            .flatten();

        Ok(close)
    }
}
