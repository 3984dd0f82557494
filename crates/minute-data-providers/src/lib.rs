pub mod alpaca;
pub mod batch;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod finnhub;
pub mod provider;
pub mod yahoo;
