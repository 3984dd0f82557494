use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use minute_data_core::request;
use minute_data_core::result::{BatchResponse, SymbolResult};
use minute_data_core::window::TimeWindow;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::error::BatchError;
use crate::fetcher::SymbolFetcher;
use crate::provider::CandleProvider;

/// Runs one multi-symbol request against a provider.
///
/// Request validation and the provider's configuration check happen up
/// front; after that every symbol is fetched independently and the batch
/// always completes with one result per distinct symbol.
pub struct BatchRunner {
    fetcher: Arc<SymbolFetcher>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(provider: Arc<dyn CandleProvider>, config: &FetchConfig) -> Self {
        Self {
            fetcher: Arc::new(SymbolFetcher::new(provider, config.timeout)),
            concurrency: config.concurrency.max(1),
        }
    }

    pub async fn run(
        &self,
        symbols_raw: &str,
        lookback_minutes: u32,
    ) -> Result<BatchResponse, BatchError> {
        self.run_at(symbols_raw, lookback_minutes, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit "now" for the window end.
    pub async fn run_at(
        &self,
        symbols_raw: &str,
        lookback_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<BatchResponse, BatchError> {
        let symbols = request::parse_symbols(symbols_raw)?;
        let lookback_minutes = request::validate_lookback(lookback_minutes)?;

        let provider = self.fetcher.provider();
        provider
            .check_config()
            .map_err(|e| BatchError::Config(e.to_string()))?;

        let window = TimeWindow::compute(lookback_minutes, &provider.limits(), now);
        info!(
            "Fetching {} symbol(s) from {} for the last {} minute(s)",
            symbols.len(),
            provider.name(),
            window.lookback_minutes
        );

        let mut response = BatchResponse::new(lookback_minutes, &window);
        let mut results = stream::iter(symbols)
            .map(|symbol| {
                let fetcher = Arc::clone(&self.fetcher);
                let window = window.clone();
                async move {
                    let task_symbol = symbol.clone();
                    let handle =
                        tokio::spawn(async move { fetcher.fetch(&task_symbol, &window).await });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!("{symbol}: fetch task failed: {e}");
                            SymbolResult::error(format!("fetch task failed: {e}"))
                        }
                    };
                    (symbol, result)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((symbol, result)) = results.next().await {
            response.insert(symbol, result);
        }

        info!(
            "Batch complete: {}/{} symbol(s) ok",
            response.ok_count(),
            response.symbols.len()
        );
        Ok(response)
    }
}
