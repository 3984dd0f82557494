use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use minute_data_core::normalize::{RawPayload, RawRow, RowOrientedShape};
use minute_data_core::window::{ProviderLimits, TimeWindow};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{self, CandleProvider};

pub const ALPACA_DATA_BASE_URL: &str = "https://data.alpaca.markets/v2";

const ALPACA_LIMITS: ProviderLimits = ProviderLimits {
    max_lookback_minutes: 43200,
    resolution: "1",
    buckets: &[],
};

#[derive(Debug, Clone)]
pub struct AlpacaCredentials {
    pub key_id: String,
    pub secret_key: String,
}

/// Alpaca market data provider.
/// Authenticates via APCA-API-KEY-ID and APCA-API-SECRET-KEY headers.
pub struct AlpacaProvider {
    client: Client,
    credentials: Option<AlpacaCredentials>,
    base_url: String,
}

impl AlpacaProvider {
    /// Create with optional credentials and base URL override.
    /// Missing credentials are reported per batch through `check_config`.
    pub fn new(
        client: Client,
        credentials: Option<AlpacaCredentials>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            base_url: base_url.unwrap_or_else(|| ALPACA_DATA_BASE_URL.to_string()),
        }
    }

    fn credentials(&self) -> Result<&AlpacaCredentials, ProviderError> {
        self.credentials.as_ref().ok_or_else(|| {
            ProviderError::Config("ALPACA_API_KEY_ID and ALPACA_API_SECRET_KEY must be set".into())
        })
    }
}

#[derive(Debug, Deserialize)]
struct AlpacaBarsResponse {
    bars: Option<Vec<RawRow>>,
    next_page_token: Option<String>,
}

fn rfc3339(ts: i64) -> Result<String, ProviderError> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| ProviderError::Parse(format!("invalid unix timestamp: {ts}")))
}

#[async_trait]
impl CandleProvider for AlpacaProvider {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn limits(&self) -> ProviderLimits {
        ALPACA_LIMITS
    }

    fn check_config(&self) -> Result<(), ProviderError> {
        self.credentials().map(|_| ())
    }

    async fn fetch_payload(
        &self,
        symbol: &str,
        window: &TimeWindow,
    ) -> Result<RawPayload, ProviderError> {
        let credentials = self.credentials()?;
        let start = rfc3339(window.from)?;
        let end = rfc3339(window.to)?;
        let url = provider::endpoint(&self.base_url, &["stocks", symbol, "bars"])?;

        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .header("APCA-API-KEY-ID", &credentials.key_id)
                .header("APCA-API-SECRET-KEY", &credentials.secret_key)
                .query(&[
                    ("timeframe", "1Min"),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                    ("feed", "iex"),
                    ("limit", "10000"),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token.as_str())]);
            }

            let response = provider::check_status(request.send().await?).await?;
            let body: AlpacaBarsResponse = provider::decode_json(response).await?;

            if let Some(mut bars) = body.bars {
                rows.append(&mut bars);
            }

            match body.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("{symbol}: alpaca returned {} bar(s)", rows.len());

        if rows.is_empty() {
            return Err(ProviderError::NoData {
                code: "no_data".into(),
                message: format!("alpaca returned no bars for {symbol}"),
            });
        }

        Ok(RawPayload::Rows(RowOrientedShape { rows }))
    }
}
