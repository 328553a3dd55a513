mod asset;
mod historical_price;

pub use asset::{Asset, AssetType};
pub use historical_price::{HistoricalPrice, NewHistoricalPrice, PreloadReport, PriceSource};
