use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One price observation for one asset on one UTC calendar day.
///
/// `date` is the cache key (together with `asset_id`); a past day's price is
/// immutable once recorded, so there is no TTL or staleness tracking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPrice {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub date: NaiveDate,
    pub price: f64,
    pub currency: String,
    pub source: PriceSource,
    pub created_at: DateTime<Utc>,
}

/// Insert shape; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewHistoricalPrice {
    pub asset_id: Uuid,
    pub date: NaiveDate,
    pub price: f64,
    pub currency: String,
    pub source: PriceSource,
}

/// Provenance of a price record. Informational only; never used to pick
/// between conflicting records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "price_source", rename_all = "UPPERCASE")]
pub enum PriceSource {
    Coingecko,
    Yahoo,
    Manual,
}

/// Outcome counters for one preload run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    pub loaded: u32,
    pub skipped: u32,
    pub errors: u32,
}
