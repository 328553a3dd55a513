use std::sync::Arc;

use sqlx::PgPool;

use crate::external::price_provider::ProviderRegistry;
use crate::store::HistoricalPriceStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn HistoricalPriceStore>,
    pub providers: Arc<ProviderRegistry>,
}
