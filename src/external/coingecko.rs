use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::external::price_provider::{HistoricalPriceProvider, ProviderError};
use crate::models::PriceSource;

/// CoinGecko's free history endpoint does not serve dates this far back
/// reliably, so older requests are rejected up front.
const MAX_HISTORY_DAYS: i64 = 365;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko historical price provider for crypto assets. No API key required.
pub struct CoinGeckoProvider {
    client: reqwest::Client,
}

impl CoinGeckoProvider {
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

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CoinGeckoHistoryResponse {
    market_data: Option<CoinGeckoMarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoMarketData {
    current_price: Option<CoinGeckoCurrentPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoCurrentPrice {
    usd: Option<f64>,
}

/// CoinGecko's history endpoint takes the day as DD-MM-YYYY.
fn format_history_date(day: NaiveDate) -> String {
    day.format("%d-%m-%Y").to_string()
}

#[async_trait]
impl HistoricalPriceProvider for CoinGeckoProvider {
    fn source(&self) -> PriceSource {
        PriceSource::Coingecko
    }

    async fn fetch_daily_close(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> Result<Option<f64>, ProviderError> {
        let today = Utc::now().date_naive();
        if (today - day).num_days() > MAX_HISTORY_DAYS {
            warn!(
                "[CoinGecko] {} on {} is more than {} days old, skipping",
                symbol, day, MAX_HISTORY_DAYS
            );
            return Ok(None);
        }

        let url = format!("https://api.coingecko.com/api/v3/coins/{}/history", symbol);
        let resp = self
            .client
            .get(&url)
            .query(&[("date", format_history_date(day))])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            warn!("[CoinGecko] No historical price for {} on {}", symbol, day);
            return Ok(None);
        }

        let body: CoinGeckoHistoryResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("[CoinGecko] Unexpected response for {} on {}: {}", symbol, day, e);
                return Ok(None);
            }
        };

        Ok(body
            .market_data
            .and_then(|m| m.current_price)
            .and_then(|p| p.usd))
    }
}
