use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{AssetType, PriceSource};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
}

/// One external market-data source, wrapped as a single fetch function.
///
/// "No data for this day" is `Ok(None)`, never an error; adapters reserve
/// `Err` for transport failures so callers can distinguish a gap in the
/// source's history from a failed request.
#[async_trait]
pub trait HistoricalPriceProvider: Send + Sync {
    /// Provenance tag stamped on records persisted from this provider.
    fn source(&self) -> PriceSource;

    /// Closing/reference price in USD for one UTC calendar day.
    async fn fetch_daily_close(
        &self,
        symbol: &str,
        day: NaiveDate,
    ) -> Result<Option<f64>, ProviderError>;
}

/// Explicit mapping from asset class to its one historical provider.
/// Constructed once at startup and passed in; there is no dynamic
/// registration.
pub struct ProviderRegistry {
    crypto: Arc<dyn HistoricalPriceProvider>,
    equity: Arc<dyn HistoricalPriceProvider>,
}

impl ProviderRegistry {
    pub fn new(
        crypto: Arc<dyn HistoricalPriceProvider>,
        equity: Arc<dyn HistoricalPriceProvider>,
    ) -> Self {
        Self { crypto, equity }
    }

    /// Asset classes without a historical source resolve to `None`.
    pub fn for_asset_type(&self, asset_type: AssetType) -> Option<&dyn HistoricalPriceProvider> {
        match asset_type {
            AssetType::Crypto => Some(self.crypto.as_ref()),
            AssetType::Stock | AssetType::Forex => Some(self.equity.as_ref()),
            AssetType::Manual | AssetType::Other => None,
        }
    }
}
