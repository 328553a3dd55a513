pub mod asset_queries;
