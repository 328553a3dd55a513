use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{HistoricalPrice, NewHistoricalPrice};
use crate::store::{HistoricalPriceStore, StoreError};

pub struct PgHistoricalPriceStore {
    pool: PgPool,
}

impl PgHistoricalPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoricalPriceStore for PgHistoricalPriceStore {
    async fn find_by_asset_and_day(
        &self,
        asset_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<HistoricalPrice>, StoreError> {
        let price = sqlx::query_as::<_, HistoricalPrice>(
            "SELECT id, asset_id, date, price, currency, source, created_at
             FROM historical_prices
             WHERE asset_id = $1 AND date = $2",
        )
        .bind(asset_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }

    async fn find_by_asset_and_range(
        &self,
        asset_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalPrice>, StoreError> {
        let prices = sqlx::query_as::<_, HistoricalPrice>(
            "SELECT id, asset_id, date, price, currency, source, created_at
             FROM historical_prices
             WHERE asset_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date ASC",
        )
        .bind(asset_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(prices)
    }

    async fn find_latest(&self, asset_id: Uuid) -> Result<Option<HistoricalPrice>, StoreError> {
        let price = sqlx::query_as::<_, HistoricalPrice>(
            "SELECT id, asset_id, date, price, currency, source, created_at
             FROM historical_prices
             WHERE asset_id = $1
             ORDER BY date DESC
             LIMIT 1",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price)
    }

    async fn insert(&self, price: NewHistoricalPrice) -> Result<HistoricalPrice, StoreError> {
        let inserted = sqlx::query_as::<_, HistoricalPrice>(
            "INSERT INTO historical_prices (id, asset_id, date, price, currency, source)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, asset_id, date, price, currency, source, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(price.asset_id)
        .bind(price.date)
        .bind(price.price)
        .bind(price.currency)
        .bind(price.source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(e),
        })?;
        Ok(inserted)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM historical_prices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM historical_prices WHERE date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
