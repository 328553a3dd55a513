use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Asset;

/// Assets are owned by the portfolio CRUD layer; this subsystem only reads
/// them to resolve the provider symbol and asset class.
pub async fn fetch_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as::<_, Asset>(
        "SELECT id, symbol, name, asset_type, created_at
         FROM assets
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
