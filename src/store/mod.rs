mod pg;

pub use pg::PgHistoricalPriceStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{HistoricalPrice, NewHistoricalPrice};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a historical price already exists for this asset and day")]
    Duplicate,
    #[error("historical price not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence contract for the historical price cache.
///
/// Keyed by `(asset_id, date)` with at most one record per pair; the backing
/// storage enforces that with a uniqueness constraint and reports violations
/// as [`StoreError::Duplicate`].
#[async_trait]
pub trait HistoricalPriceStore: Send + Sync {
    async fn find_by_asset_and_day(
        &self,
        asset_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<HistoricalPrice>, StoreError>;

    /// Inclusive range, ascending by date.
    async fn find_by_asset_and_range(
        &self,
        asset_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalPrice>, StoreError>;

    async fn find_latest(&self, asset_id: Uuid) -> Result<Option<HistoricalPrice>, StoreError>;

    async fn insert(&self, price: NewHistoricalPrice) -> Result<HistoricalPrice, StoreError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deletes records strictly older than `cutoff`; returns the count removed.
    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;
}
