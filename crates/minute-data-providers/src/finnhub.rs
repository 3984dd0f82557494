use async_trait::async_trait;
use minute_data_core::normalize::{ParallelArrayShape, RawPayload};
use minute_data_core::window::{ProviderLimits, TimeWindow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{self, CandleProvider};

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

const FINNHUB_LIMITS: ProviderLimits = ProviderLimits {
    // One month of intraday history.
    max_lookback_minutes: 43200,
    resolution: "1",
    buckets: &[],
};

/// Finnhub stock candle API.
/// Authenticates with a `token` query parameter.
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl FinnhubProvider {
    /// A missing key is reported per batch through `check_config`, not here.
    pub fn new(client: Client, api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| FINNHUB_BASE_URL.to_string()),
        }
    }
}

/// Finnhub's candle response. `s` is `"ok"` or `"no_data"`; arrays are absent on `no_data`.
#[derive(Debug, Deserialize)]
struct FinnhubCandles {
    s: String,
    #[serde(default)]
    t: Vec<Value>,
    #[serde(default)]
    o: Vec<Value>,
    #[serde(default)]
    h: Vec<Value>,
    #[serde(default)]
    l: Vec<Value>,
    #[serde(default)]
    c: Vec<Value>,
    #[serde(default)]
    v: Vec<Value>,
}

fn into_payload(body: FinnhubCandles, symbol: &str) -> Result<RawPayload, ProviderError> {
    if body.s != "ok" {
        return Err(ProviderError::NoData {
            message: format!("finnhub returned '{}' for {symbol}", body.s),
            code: body.s,
        });
    }

    if body.t.is_empty() {
        return Err(ProviderError::NoData {
            code: "no_data".into(),
            message: format!("finnhub returned no candles for {symbol}"),
        });
    }

    Ok(RawPayload::ParallelArrays(ParallelArrayShape {
        timestamps: body.t,
        opens: body.o,
        highs: body.h,
        lows: body.l,
        closes: body.c,
        volumes: body.v,
    }))
}

#[async_trait]
impl CandleProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "finnhub"
    }

    fn limits(&self) -> ProviderLimits {
        FINNHUB_LIMITS
    }

    fn check_config(&self) -> Result<(), ProviderError> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(ProviderError::Config("FINNHUB_API_KEY not set".into())),
        }
    }

    async fn fetch_payload(
        &self,
        symbol: &str,
        window: &TimeWindow,
    ) -> Result<RawPayload, ProviderError> {
        let token = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Config("FINNHUB_API_KEY not set".into()))?;

        let from = window.from.to_string();
        let to = window.to.to_string();

        debug!("Fetching {symbol} candles from finnhub");
        let response = self
            .client
            .get(format!("{}/stock/candle", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("resolution", window.resolution.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", token),
            ])
            .send()
            .await?;

        let response = provider::check_status(response).await?;
        let body: FinnhubCandles = provider::decode_json(response).await?;
        into_payload(body, symbol)
    }
}
