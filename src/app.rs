use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, historical_prices};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/historical-prices", historical_prices::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
