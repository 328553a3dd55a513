use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::price_provider::ProviderRegistry;
use crate::models::{Asset, HistoricalPrice, NewHistoricalPrice, PreloadReport, PriceSource};
use crate::store::{HistoricalPriceStore, StoreError};

/// Pause after each provider call during preload, to stay inside the free
/// tiers' rate limits.
const PRELOAD_DELAY: Duration = Duration::from_millis(100);

/// Records strictly older than this are removed by the cleanup sweep.
const RETENTION_DAYS: i64 = 365;

/// Cache-aside lookup for one asset on one calendar day.
///
/// The store is checked first; on a miss the asset class's provider is asked
/// and a positive result is persisted. An unknown price is `None`, never an
/// error: provider failures, unsupported asset classes and storage trouble
/// are all logged and absorbed here.
pub async fn get_price(
    store: &dyn HistoricalPriceStore,
    providers: &ProviderRegistry,
    asset: &Asset,
    at: DateTime<Utc>,
    currency: &str,
) -> Option<f64> {
    let day = at.date_naive();

    match store.find_by_asset_and_day(asset.id, day).await {
        Ok(Some(cached)) => {
            info!("[HistoricalPrice] Found in store: {} on {} = ${}", asset.name, day, cached.price);
            return Some(cached.price);
        }
        Ok(None) => {}
        Err(e) => {
            error!("[HistoricalPrice] Lookup failed for {} on {}: {}", asset.name, day, e);
            return None;
        }
    }

    let provider = providers.for_asset_type(asset.asset_type)?;

    let price = match provider.fetch_daily_close(&asset.symbol, day).await {
        Ok(Some(price)) if price > 0.0 => price,
        // No negative caching: leave the day absent so a later call can retry.
        Ok(_) => {
            info!("[HistoricalPrice] No price found for {} on {}", asset.name, day);
            return None;
        }
        Err(e) => {
            warn!("[HistoricalPrice] Provider call failed for {} on {}: {}", asset.name, day, e);
            return None;
        }
    };

    let record = NewHistoricalPrice {
        asset_id: asset.id,
        date: day,
        price,
        currency: currency.to_string(),
        source: provider.source(),
    };

    match store.insert(record).await {
        Ok(_) => {
            info!("[HistoricalPrice] Saved to store: {} on {} = ${}", asset.name, day, price);
        }
        // Lost a cache-fill race; someone else already cached this day.
        Err(StoreError::Duplicate) => {
            if let Ok(Some(existing)) = store.find_by_asset_and_day(asset.id, day).await {
                return Some(existing.price);
            }
        }
        // The fetched price is still returned even though it was not cached.
        Err(e) => {
            warn!("[HistoricalPrice] Failed to save {} on {}: {}", asset.name, day, e);
        }
    }

    Some(price)
}

/// Inclusive range read, ascending by date. Empty on storage failure.
pub async fn get_prices_in_range(
    store: &dyn HistoricalPriceStore,
    asset_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<HistoricalPrice> {
    match store.find_by_asset_and_range(asset_id, start, end).await {
        Ok(prices) => prices,
        Err(e) => {
            error!("[HistoricalPrice] Range lookup failed for asset {}: {}", asset_id, e);
            Vec::new()
        }
    }
}

/// Most recent record for the asset, if any. `None` on storage failure.
pub async fn get_latest_price(
    store: &dyn HistoricalPriceStore,
    asset_id: Uuid,
) -> Option<HistoricalPrice> {
    match store.find_latest(asset_id).await {
        Ok(price) => price,
        Err(e) => {
            error!("[HistoricalPrice] Latest lookup failed for asset {}: {}", asset_id, e);
            None
        }
    }
}

/// Records a price the user entered by hand. Unlike the cache-fill path this
/// represents explicit intent, so storage errors propagate to the caller.
pub async fn create_manual_price(
    store: &dyn HistoricalPriceStore,
    price: NewHistoricalPrice,
) -> Result<HistoricalPrice, AppError> {
    if price.price <= 0.0 {
        return Err(AppError::Validation("price must be positive".to_string()));
    }

    let created = store.insert(price).await?;
    info!(
        "[HistoricalPrice] Created manual price for asset {} on {} = ${}",
        created.asset_id, created.date, created.price
    );
    Ok(created)
}

pub async fn delete_price(store: &dyn HistoricalPriceStore, id: Uuid) -> Result<(), AppError> {
    store.delete_by_id(id).await?;
    info!("[HistoricalPrice] Deleted historical price {}", id);
    Ok(())
}

/// Removes records strictly older than one year before now; returns the count.
pub async fn cleanup_old_prices(store: &dyn HistoricalPriceStore) -> Result<u64, AppError> {
    let cutoff = Utc::now().date_naive() - ChronoDuration::days(RETENTION_DAYS);
    let deleted = store.delete_older_than(cutoff).await?;
    info!("[HistoricalPrice] Cleaned up {} old prices", deleted);
    Ok(deleted)
}

/// Saves today's spot price as a MANUAL record, unless today is already
/// cached. Used by the current-price refresh flow; failures are absorbed.
#[allow(dead_code)]
pub async fn record_current_price(
    store: &dyn HistoricalPriceStore,
    asset: &Asset,
    price: f64,
    currency: &str,
) {
    if price <= 0.0 {
        return;
    }

    let today = Utc::now().date_naive();
    match store.find_by_asset_and_day(asset.id, today).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let record = NewHistoricalPrice {
                asset_id: asset.id,
                date: today,
                price,
                currency: currency.to_string(),
                source: PriceSource::Manual,
            };
            match store.insert(record).await {
                Ok(_) => {
                    info!("[HistoricalPrice] Saved current price for {}: ${}", asset.name, price);
                }
                Err(StoreError::Duplicate) => {}
                Err(e) => {
                    warn!("[HistoricalPrice] Failed to save current price for {}: {}", asset.name, e);
                }
            }
        }
        Err(e) => {
            warn!("[HistoricalPrice] Lookup failed for {} today: {}", asset.name, e);
        }
    }
}

/// Walks every calendar day from `first_date` through today and makes sure
/// each one is cached: already-present days are skipped, the rest are fetched
/// and stored with a short pause between provider calls. One day's failure
/// never aborts the run, and interrupting it is safe; the next run re-derives
/// `skipped` from the store.
///
/// Days are processed strictly in ascending order, one at a time.
pub async fn preload_historical_prices(
    store: &dyn HistoricalPriceStore,
    providers: &ProviderRegistry,
    asset: &Asset,
    first_date: DateTime<Utc>,
    currency: &str,
) -> PreloadReport {
    let start = first_date.date_naive();
    let today = Utc::now().date_naive();
    let mut report = PreloadReport::default();

    info!("[HistoricalPrice] Starting preload for {} from {} to {}", asset.name, start, today);

    let mut day = start;
    while day <= today {
        let current = day;
        day += ChronoDuration::days(1);

        match store.find_by_asset_and_day(asset.id, current).await {
            Ok(Some(existing)) => {
                info!(
                    "[HistoricalPrice] Price already exists for {} on {}: ${}",
                    asset.name, current, existing.price
                );
                report.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                error!("[HistoricalPrice] Lookup failed for {} on {}: {}", asset.name, current, e);
                report.errors += 1;
                continue;
            }
        }

        // Asset classes without a historical source leave the day uncached.
        let Some(provider) = providers.for_asset_type(asset.asset_type) else {
            continue;
        };

        match provider.fetch_daily_close(&asset.symbol, current).await {
            Ok(Some(price)) if price > 0.0 => {
                let record = NewHistoricalPrice {
                    asset_id: asset.id,
                    date: current,
                    price,
                    currency: currency.to_string(),
                    source: provider.source(),
                };
                match store.insert(record).await {
                    Ok(_) => {
                        info!(
                            "[HistoricalPrice] Saved to store: {} on {} = ${}",
                            asset.name, current, price
                        );
                        report.loaded += 1;
                    }
                    Err(StoreError::Duplicate) => {
                        report.skipped += 1;
                    }
                    Err(e) => {
                        error!(
                            "[HistoricalPrice] Failed to save {} on {}: {}",
                            asset.name, current, e
                        );
                        report.errors += 1;
                    }
                }
            }
            // A gap; a later preload or get_price call may fill it.
            Ok(_) => {
                info!("[HistoricalPrice] No valid price for {} on {}", asset.name, current);
            }
            Err(e) => {
                warn!(
                    "[HistoricalPrice] Provider call failed for {} on {}: {}",
                    asset.name, current, e
                );
                report.errors += 1;
            }
        }

        sleep(PRELOAD_DELAY).await;
    }

    info!(
        "[HistoricalPrice] Preload completed for {}: {} loaded, {} skipped, {} errors",
        asset.name, report.loaded, report.skipped, report.errors
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::{HistoricalPriceProvider, ProviderError};
    use crate::models::AssetType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct MemoryStore {
        records: Mutex<Vec<HistoricalPrice>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self { records: Mutex::new(Vec::new()) }
        }

        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HistoricalPriceStore for MemoryStore {
        async fn find_by_asset_and_day(
            &self,
            asset_id: Uuid,
            day: NaiveDate,
        ) -> Result<Option<HistoricalPrice>, StoreError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.asset_id == asset_id && r.date == day)
                .cloned())
        }

        async fn find_by_asset_and_range(
            &self,
            asset_id: Uuid,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<HistoricalPrice>, StoreError> {
            let mut prices: Vec<_> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.asset_id == asset_id && r.date >= start && r.date <= end)
                .cloned()
                .collect();
            prices.sort_by_key(|r| r.date);
            Ok(prices)
        }

        async fn find_latest(&self, asset_id: Uuid) -> Result<Option<HistoricalPrice>, StoreError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.asset_id == asset_id)
                .max_by_key(|r| r.date)
                .cloned())
        }

        async fn insert(&self, price: NewHistoricalPrice) -> Result<HistoricalPrice, StoreError> {
            let mut records = self.records.lock().unwrap();
            if records
                .iter()
                .any(|r| r.asset_id == price.asset_id && r.date == price.date)
            {
                return Err(StoreError::Duplicate);
            }
            let record = HistoricalPrice {
                id: Uuid::new_v4(),
                asset_id: price.asset_id,
                date: price.date,
                price: price.price,
                currency: price.currency,
                source: price.source,
                created_at: Utc::now(),
            };
            records.push(record.clone());
            Ok(record)
        }

        async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(StoreError::NotFound);
            }
            Ok(())
        }

        async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.date >= cutoff);
            Ok((before - records.len()) as u64)
        }
    }

    /// Every operation fails, as if the database were unreachable.
    struct FailingStore;

    #[async_trait]
    impl HistoricalPriceStore for FailingStore {
        async fn find_by_asset_and_day(
            &self,
            _asset_id: Uuid,
            _day: NaiveDate,
        ) -> Result<Option<HistoricalPrice>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_by_asset_and_range(
            &self,
            _asset_id: Uuid,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<HistoricalPrice>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_latest(&self, _asset_id: Uuid) -> Result<Option<HistoricalPrice>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn insert(&self, _price: NewHistoricalPrice) -> Result<HistoricalPrice, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete_by_id(&self, _id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete_older_than(&self, _cutoff: NaiveDate) -> Result<u64, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    type Respond = Box<dyn Fn(NaiveDate) -> Result<Option<f64>, ProviderError> + Send + Sync>;

    struct StubProvider {
        source: PriceSource,
        calls: AtomicUsize,
        respond: Respond,
    }

    impl StubProvider {
        fn fixed(source: PriceSource, price: f64) -> Self {
            Self::with(source, move |_| Ok(Some(price)))
        }

        fn empty(source: PriceSource) -> Self {
            Self::with(source, |_| Ok(None))
        }

        fn with(
            source: PriceSource,
            respond: impl Fn(NaiveDate) -> Result<Option<f64>, ProviderError> + Send + Sync + 'static,
        ) -> Self {
            Self { source, calls: AtomicUsize::new(0), respond: Box::new(respond) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HistoricalPriceProvider for StubProvider {
        fn source(&self) -> PriceSource {
            self.source
        }

        async fn fetch_daily_close(
            &self,
            _symbol: &str,
            day: NaiveDate,
        ) -> Result<Option<f64>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(day)
        }
    }

    fn asset(asset_type: AssetType) -> Asset {
        Asset {
            id: Uuid::new_v4(),
            symbol: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            asset_type,
            created_at: Utc::now(),
        }
    }

    fn registry(crypto: Arc<StubProvider>, equity: Arc<StubProvider>) -> ProviderRegistry {
        ProviderRegistry::new(crypto, equity)
    }

    fn days_ago(n: i64) -> NaiveDate {
        Utc::now().date_naive() - ChronoDuration::days(n)
    }

    #[tokio::test]
    async fn second_lookup_is_a_cache_hit() {
        let store = MemoryStore::new();
        let crypto = Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0));
        let providers = registry(crypto.clone(), Arc::new(StubProvider::empty(PriceSource::Yahoo)));
        let asset = asset(AssetType::Crypto);
        let at = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let first = get_price(&store, &providers, &asset, at, "USD").await;
        let second = get_price(&store, &providers, &asset, at, "USD").await;

        assert_eq!(first, Some(42_000.0));
        assert_eq!(second, Some(42_000.0));
        assert_eq!(crypto.call_count(), 1);
    }

    #[tokio::test]
    async fn timestamps_on_the_same_day_share_one_record() {
        let store = MemoryStore::new();
        let crypto = Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0));
        let providers = registry(crypto.clone(), Arc::new(StubProvider::empty(PriceSource::Yahoo)));
        let asset = asset(AssetType::Crypto);

        let late = "2024-03-01T23:59:59Z".parse::<DateTime<Utc>>().unwrap();
        let early = "2024-03-01T00:00:01Z".parse::<DateTime<Utc>>().unwrap();

        assert_eq!(get_price(&store, &providers, &asset, late, "USD").await, Some(42_000.0));
        assert_eq!(get_price(&store, &providers, &asset, early, "USD").await, Some(42_000.0));
        assert_eq!(crypto.call_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_prices_are_not_cached() {
        let store = MemoryStore::new();
        let asset = asset(AssetType::Crypto);
        let at = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let empty = registry(
            Arc::new(StubProvider::empty(PriceSource::Coingecko)),
            Arc::new(StubProvider::empty(PriceSource::Yahoo)),
        );
        assert_eq!(get_price(&store, &empty, &asset, at, "USD").await, None);
        assert_eq!(store.len(), 0);

        // The provider has data now; the earlier miss must not block it.
        let filled = registry(
            Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0)),
            Arc::new(StubProvider::empty(PriceSource::Yahoo)),
        );
        assert_eq!(get_price(&store, &filled, &asset, at, "USD").await, Some(42_000.0));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn zero_and_negative_prices_are_rejected() {
        let store = MemoryStore::new();
        let asset = asset(AssetType::Crypto);
        let at = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let providers = registry(
            Arc::new(StubProvider::fixed(PriceSource::Coingecko, 0.0)),
            Arc::new(StubProvider::empty(PriceSource::Yahoo)),
        );

        assert_eq!(get_price(&store, &providers, &asset, at, "USD").await, None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn one_record_per_asset_and_day() {
        let store = MemoryStore::new();
        let asset_id = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let new = |price: f64| NewHistoricalPrice {
            asset_id,
            date: day,
            price,
            currency: "USD".to_string(),
            source: PriceSource::Manual,
        };

        store.insert(new(100.0)).await.unwrap();
        let second = store.insert(new(200.0)).await;
        assert!(matches!(second, Err(StoreError::Duplicate)));

        let in_range = store.find_by_asset_and_range(asset_id, day, day).await.unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].price, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn preload_covers_every_day_and_reruns_skip() {
        let store = MemoryStore::new();
        let crypto = Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0));
        let providers = registry(crypto.clone(), Arc::new(StubProvider::empty(PriceSource::Yahoo)));
        let asset = asset(AssetType::Crypto);
        let first_date = Utc::now() - ChronoDuration::days(5);

        let first = preload_historical_prices(&store, &providers, &asset, first_date, "USD").await;
        assert_eq!(first, PreloadReport { loaded: 6, skipped: 0, errors: 0 });

        let second = preload_historical_prices(&store, &providers, &asset, first_date, "USD").await;
        assert_eq!(second, PreloadReport { loaded: 0, skipped: 6, errors: 0 });
        assert_eq!(crypto.call_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn one_bad_day_does_not_abort_preload() {
        let store = MemoryStore::new();
        let bad_day = days_ago(4);
        let crypto = Arc::new(StubProvider::with(PriceSource::Coingecko, move |day| {
            if day == bad_day {
                Err(ProviderError::Network("connection reset".to_string()))
            } else {
                Ok(Some(42_000.0))
            }
        }));
        let providers = registry(crypto, Arc::new(StubProvider::empty(PriceSource::Yahoo)));
        let asset = asset(AssetType::Crypto);
        let first_date = Utc::now() - ChronoDuration::days(9);

        let report = preload_historical_prices(&store, &providers, &asset, first_date, "USD").await;
        assert_eq!(report, PreloadReport { loaded: 9, skipped: 0, errors: 1 });

        // The nine good days are persisted and independently retrievable.
        assert_eq!(store.len(), 9);
        assert!(store.find_by_asset_and_day(asset.id, bad_day).await.unwrap().is_none());
        assert!(store.find_by_asset_and_day(asset.id, days_ago(5)).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn provider_gaps_count_as_neither_skipped_nor_error() {
        let store = MemoryStore::new();
        let gap_day = days_ago(2);
        let crypto = Arc::new(StubProvider::with(PriceSource::Coingecko, move |day| {
            if day == gap_day {
                Ok(None)
            } else {
                Ok(Some(42_000.0))
            }
        }));
        let providers = registry(crypto, Arc::new(StubProvider::empty(PriceSource::Yahoo)));
        let asset = asset(AssetType::Crypto);
        let first_date = Utc::now() - ChronoDuration::days(4);

        let report = preload_historical_prices(&store, &providers, &asset, first_date, "USD").await;
        assert_eq!(report, PreloadReport { loaded: 4, skipped: 0, errors: 0 });
        assert!(store.find_by_asset_and_day(asset.id, gap_day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn providers_are_routed_by_asset_class() {
        let store = MemoryStore::new();
        let crypto = Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0));
        let equity = Arc::new(StubProvider::fixed(PriceSource::Yahoo, 185.0));
        let providers = registry(crypto.clone(), equity.clone());
        let at = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        get_price(&store, &providers, &asset(AssetType::Crypto), at, "USD").await;
        assert_eq!(crypto.call_count(), 1);
        assert_eq!(equity.call_count(), 0);

        get_price(&store, &providers, &asset(AssetType::Stock), at, "USD").await;
        get_price(&store, &providers, &asset(AssetType::Forex), at, "USD").await;
        assert_eq!(crypto.call_count(), 1);
        assert_eq!(equity.call_count(), 2);

        // No provider exists for manually tracked assets.
        let price = get_price(&store, &providers, &asset(AssetType::Other), at, "USD").await;
        assert_eq!(price, None);
        assert_eq!(crypto.call_count(), 1);
        assert_eq!(equity.call_count(), 2);
    }

    #[tokio::test]
    async fn read_paths_degrade_on_storage_failure() {
        let store = FailingStore;
        let providers = registry(
            Arc::new(StubProvider::fixed(PriceSource::Coingecko, 42_000.0)),
            Arc::new(StubProvider::empty(PriceSource::Yahoo)),
        );
        let asset = asset(AssetType::Crypto);
        let at = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let day = at.date_naive();

        assert_eq!(get_price(&store, &providers, &asset, at, "USD").await, None);
        assert!(get_prices_in_range(&store, asset.id, day, day).await.is_empty());
        assert!(get_latest_price(&store, asset.id).await.is_none());
    }

    #[tokio::test]
    async fn explicit_mutations_propagate_storage_failure() {
        let store = FailingStore;
        let new = NewHistoricalPrice {
            asset_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            price: 100.0,
            currency: "USD".to_string(),
            source: PriceSource::Manual,
        };

        assert!(create_manual_price(&store, new).await.is_err());
        assert!(delete_price(&store, Uuid::new_v4()).await.is_err());
        assert!(cleanup_old_prices(&store).await.is_err());
    }

    #[tokio::test]
    async fn manual_price_must_be_positive() {
        let store = MemoryStore::new();
        let new = NewHistoricalPrice {
            asset_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            price: -5.0,
            currency: "USD".to_string(),
            source: PriceSource::Manual,
        };

        let result = create_manual_price(&store, new).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn manual_duplicate_is_rejected() {
        let store = MemoryStore::new();
        let asset_id = Uuid::new_v4();
        let new = |price: f64| NewHistoricalPrice {
            asset_id,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            price,
            currency: "USD".to_string(),
            source: PriceSource::Manual,
        };

        create_manual_price(&store, new(100.0)).await.unwrap();
        let second = create_manual_price(&store, new(200.0)).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn cleanup_keeps_records_younger_than_a_year() {
        let store = MemoryStore::new();
        let asset_id = Uuid::new_v4();
        let new = |date: NaiveDate| NewHistoricalPrice {
            asset_id,
            date,
            price: 100.0,
            currency: "USD".to_string(),
            source: PriceSource::Manual,
        };

        store.insert(new(days_ago(366))).await.unwrap();
        store.insert(new(days_ago(364))).await.unwrap();

        let deleted = cleanup_old_prices(&store).await.unwrap();
        assert_eq!(deleted, 1);

        let latest = store.find_latest(asset_id).await.unwrap().unwrap();
        assert_eq!(latest.date, days_ago(364));
    }

    #[tokio::test]
    async fn current_price_is_recorded_once_per_day() {
        let store = MemoryStore::new();
        let asset = asset(AssetType::Crypto);

        record_current_price(&store, &asset, 42_000.0, "USD").await;
        record_current_price(&store, &asset, 43_000.0, "USD").await;

        let today = Utc::now().date_naive();
        let record = store.find_by_asset_and_day(asset.id, today).await.unwrap().unwrap();
        assert_eq!(record.price, 42_000.0);
        assert_eq!(record.source, PriceSource::Manual);
        assert_eq!(store.len(), 1);

        // Non-positive spot prices are ignored outright.
        record_current_price(&store, &asset, 0.0, "USD").await;
        assert_eq!(store.len(), 1);
    }
}
