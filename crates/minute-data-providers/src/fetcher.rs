use std::sync::Arc;
use std::time::Duration;

use minute_data_core::candle;
use minute_data_core::normalize::Normalize;
use minute_data_core::result::SymbolResult;
use minute_data_core::window::TimeWindow;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::CandleProvider;

/// Fetches one symbol at a time and turns every outcome into a [`SymbolResult`].
pub struct SymbolFetcher {
    provider: Arc<dyn CandleProvider>,
    timeout: Duration,
}

impl SymbolFetcher {
    pub fn new(provider: Arc<dyn CandleProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> &dyn CandleProvider {
        self.provider.as_ref()
    }

    /// One request, bounded by the timeout. Never fails: transport,
    /// provider and payload errors all come back as non-ok results.
    pub async fn fetch(&self, symbol: &str, window: &TimeWindow) -> SymbolResult {
        let provider = self.provider.name();

        let fetched =
            tokio::time::timeout(self.timeout, self.provider.fetch_payload(symbol, window)).await;
        let payload = match fetched {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                warn!("{symbol}: {provider} fetch failed: {e}");
                return failure(provider, e);
            }
            Err(_) => {
                let e = ProviderError::Timeout(self.timeout);
                warn!("{symbol}: {provider} fetch failed: {e}");
                return failure(provider, e);
            }
        };

        match payload.normalize() {
            Ok(candles) if candles.is_empty() => {
                debug!("{symbol}: {provider} payload held only empty minutes");
                SymbolResult::with_status(
                    "no_data",
                    format!("{provider} returned no candles for {symbol}"),
                )
            }
            Ok(mut candles) => {
                let returned = candles.len();
                candle::keep_latest(&mut candles, window.lookback_minutes as usize);
                debug!(
                    "{symbol}: {returned} candle(s) from {provider}, kept {}",
                    candles.len()
                );
                SymbolResult::ok(candles)
            }
            Err(e) => {
                warn!("{symbol}: malformed {provider} payload: {e}");
                failure(provider, ProviderError::Parse(e.to_string()))
            }
        }
    }
}

/// Map a provider error onto the per-symbol result reported to clients.
pub fn failure(provider: &str, error: ProviderError) -> SymbolResult {
    match error {
        ProviderError::Http(e) if e.is_timeout() => {
            SymbolResult::error(format!("Request to {provider} timed out: {e}"))
        }
        ProviderError::Http(e) => SymbolResult::error(format!("Request to {provider} failed: {e}")),
        e @ ProviderError::Timeout(_) => {
            SymbolResult::error(format!("Request to {provider} failed: {e}"))
        }
        ProviderError::RateLimited { retry_after_secs } => SymbolResult::error(format!(
            "HTTP 429 from {provider}, retry after {retry_after_secs}s"
        )),
        ProviderError::Api { status, .. } => {
            SymbolResult::error(format!("HTTP {status} from {provider}"))
        }
        ProviderError::Rejected { code, message } => {
            SymbolResult::error(format!("{provider} rejected the request: {code}: {message}"))
        }
        ProviderError::NoData { code, message } => SymbolResult::with_status(code, message),
        ProviderError::Parse(cause) => {
            SymbolResult::error(format!("Failed to parse {provider} response: {cause}"))
        }
        ProviderError::Config(cause) => {
            SymbolResult::error(format!("{provider} is not configured: {cause}"))
        }
    }
}
