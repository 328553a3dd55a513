pub mod historical_price_service;
