pub(crate) mod health;
pub(crate) mod historical_prices;
