use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{HistoricalPrice, NewHistoricalPrice, PreloadReport, PriceSource};
use crate::services::historical_price_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_historical_price))
        .route("/cleanup/old", delete(cleanup_old_prices))
        .route("/:asset_id/range", get(get_price_range))
        .route("/:asset_id/latest", get(get_latest_price))
        .route("/:asset_id/preload", post(preload_historical_prices))
        .route("/:asset_id/:date", get(get_price_for_date))
        .route("/:id", delete(delete_historical_price))
}

/// Accepts an ISO calendar day or an RFC 3339 timestamp. Timestamps are
/// normalized to their UTC day here, at the boundary; everything below this
/// layer works in whole days.
fn parse_day(input: &str) -> Result<NaiveDate, AppError> {
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(day);
    }
    input
        .parse::<DateTime<Utc>>()
        .map(|dt| dt.date_naive())
        .map_err(|_| AppError::Validation(format!("invalid date: {}", input)))
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Deserialize)]
struct CurrencyQuery {
    currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceForDateResponse {
    asset_id: Uuid,
    date: NaiveDate,
    price: Option<f64>,
    currency: String,
}

pub async fn get_price_for_date(
    State(state): State<AppState>,
    Path((asset_id, date)): Path<(Uuid, String)>,
    Query(query): Query<CurrencyQuery>,
) -> Result<Json<PriceForDateResponse>, AppError> {
    info!("GET /historical-prices/{}/{} - Getting price for date", asset_id, date);

    let asset = db::asset_queries::fetch_by_id(&state.pool, asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    let day = parse_day(&date)?;
    let currency = query.currency.unwrap_or_else(|| "USD".to_string());

    // An unknown price is data here, not an error.
    let price = historical_price_service::get_price(
        state.store.as_ref(),
        &state.providers,
        &asset,
        day_start(day),
        &currency,
    )
    .await;

    Ok(Json(PriceForDateResponse { asset_id, date: day, price, currency }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRangeResponse {
    asset_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    prices: Vec<HistoricalPrice>,
}

pub async fn get_price_range(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<PriceRangeResponse>, AppError> {
    info!("GET /historical-prices/{}/range - Getting price range", asset_id);

    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(AppError::Validation("startDate and endDate are required".to_string()));
    };
    let start = parse_day(&start)?;
    let end = parse_day(&end)?;

    let prices = historical_price_service::get_prices_in_range(
        state.store.as_ref(),
        asset_id,
        start,
        end,
    )
    .await;

    Ok(Json(PriceRangeResponse { asset_id, start_date: start, end_date: end, prices }))
}

#[derive(Debug, Serialize)]
struct LatestPriceResponse {
    price: HistoricalPrice,
}

pub async fn get_latest_price(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<LatestPriceResponse>, AppError> {
    info!("GET /historical-prices/{}/latest - Getting latest price", asset_id);

    let price = historical_price_service::get_latest_price(state.store.as_ref(), asset_id)
        .await
        .ok_or_else(|| {
            AppError::NotFound("No historical price found for this asset".to_string())
        })?;
    Ok(Json(LatestPriceResponse { price }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoricalPriceRequest {
    asset_id: Uuid,
    date: String,
    price: f64,
    currency: Option<String>,
    source: Option<PriceSource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPriceResponse {
    historical_price: HistoricalPrice,
}

pub async fn create_historical_price(
    State(state): State<AppState>,
    Json(data): Json<CreateHistoricalPriceRequest>,
) -> Result<(StatusCode, Json<CreatedPriceResponse>), AppError> {
    info!("POST /historical-prices - Creating manual price for asset {}", data.asset_id);

    db::asset_queries::fetch_by_id(&state.pool, data.asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    let day = parse_day(&data.date)?;

    let historical_price = historical_price_service::create_manual_price(
        state.store.as_ref(),
        NewHistoricalPrice {
            asset_id: data.asset_id,
            date: day,
            price: data.price,
            currency: data.currency.unwrap_or_else(|| "USD".to_string()),
            source: data.source.unwrap_or(PriceSource::Manual),
        },
    )
    .await
    .map_err(|e| {
        error!("Failed to create historical price for asset {}: {}", data.asset_id, e);
        e
    })?;

    Ok((StatusCode::CREATED, Json(CreatedPriceResponse { historical_price })))
}

pub async fn delete_historical_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("DELETE /historical-prices/{} - Deleting price", id);

    historical_price_service::delete_price(state.store.as_ref(), id)
        .await
        .map_err(|e| {
            error!("Failed to delete historical price {}: {}", id, e);
            e
        })?;
    Ok(Json(json!({ "message": "Historical price deleted" })))
}

pub async fn cleanup_old_prices(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!("DELETE /historical-prices/cleanup/old - Cleaning up old prices");

    let deleted = historical_price_service::cleanup_old_prices(state.store.as_ref())
        .await
        .map_err(|e| {
            error!("Failed to clean up old prices: {}", e);
            e
        })?;
    Ok(Json(json!({ "message": format!("Cleaned up {} old prices", deleted) })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadRequest {
    first_transaction_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreloadResponse {
    message: String,
    asset_id: Uuid,
    first_transaction_date: NaiveDate,
    result: PreloadReport,
}

pub async fn preload_historical_prices(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
    Json(data): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>, AppError> {
    info!("POST /historical-prices/{}/preload - Preloading prices", asset_id);

    let asset = db::asset_queries::fetch_by_id(&state.pool, asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    let first_day = parse_day(&data.first_transaction_date)?;

    let result = historical_price_service::preload_historical_prices(
        state.store.as_ref(),
        &state.providers,
        &asset,
        day_start(first_day),
        "USD",
    )
    .await;

    Ok(Json(PreloadResponse {
        message: "Historical price preload completed".to_string(),
        asset_id,
        first_transaction_date: first_day,
        result,
    }))
}
