mod app;
mod db;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::external::coingecko::CoinGeckoProvider;
use crate::external::price_provider::ProviderRegistry;
use crate::external::yahoo::YahooProvider;
use crate::logging::LoggingConfig;
use crate::state::AppState;
use crate::store::PgHistoricalPriceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init_logging(LoggingConfig::from_env())?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    // One historical provider per asset class, wired explicitly; neither
    // needs an API key.
    let providers = Arc::new(ProviderRegistry::new(
        Arc::new(CoinGeckoProvider::new()),
        Arc::new(YahooProvider::new()),
    ));
    let store = Arc::new(PgHistoricalPriceStore::new(pool.clone()));

    let state = AppState { pool, store, providers };
    let app = app::create_app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Portfolio tracker backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
