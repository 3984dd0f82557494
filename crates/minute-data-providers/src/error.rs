use std::time::Duration;

use minute_data_core::error::MarketDataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered 200 but flagged the request as failed.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// The provider has nothing for the symbol. `code` is the provider's own marker.
    #[error("{message}")]
    NoData { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider configuration error: {0}")]
    Config(String),
}

/// Errors that abort a whole batch. Per-symbol failures never end up here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    InvalidRequest(#[from] MarketDataError),

    #[error("{0}")]
    Config(String),
}
