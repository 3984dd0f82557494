use async_trait::async_trait;
use minute_data_core::normalize::{ParallelArrayShape, RawPayload};
use minute_data_core::window::{PeriodBucket, ProviderLimits, TimeWindow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{self, CandleProvider};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo only serves 1-minute bars for a handful of fixed ranges.
const YAHOO_BUCKETS: &[PeriodBucket] = &[
    PeriodBucket {
        label: "1d",
        max_minutes: 1440,
    },
    PeriodBucket {
        label: "5d",
        max_minutes: 7200,
    },
    PeriodBucket {
        label: "7d",
        max_minutes: 10080,
    },
];

const WIDEST_RANGE: &str = "7d";

const YAHOO_LIMITS: ProviderLimits = ProviderLimits {
    max_lookback_minutes: 10080,
    resolution: "1",
    buckets: YAHOO_BUCKETS,
};

/// Yahoo Finance chart API.
/// No authentication required. Limited to ~7 days of 1-minute history.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, YAHOO_CHART_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Option<Vec<Value>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Value>,
    #[serde(default)]
    high: Vec<Value>,
    #[serde(default)]
    low: Vec<Value>,
    #[serde(default)]
    close: Vec<Value>,
    #[serde(default)]
    volume: Vec<Value>,
}

fn into_payload(body: YahooResponse, symbol: &str) -> Result<RawPayload, ProviderError> {
    if let Some(error) = body.chart.error {
        return Err(ProviderError::Rejected {
            code: error.code,
            message: error.description,
        });
    }

    let no_data = || ProviderError::NoData {
        code: "no_data".into(),
        message: format!("no chart data returned for {symbol}"),
    };

    let result = body
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(no_data)?;

    let timestamps = match result.timestamp {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(no_data()),
    };

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing indicators.quote".into()))?;

    Ok(RawPayload::ParallelArrays(ParallelArrayShape {
        timestamps,
        opens: quote.open,
        highs: quote.high,
        lows: quote.low,
        closes: quote.close,
        volumes: quote.volume,
    }))
}

#[async_trait]
impl CandleProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn limits(&self) -> ProviderLimits {
        YAHOO_LIMITS
    }

    async fn fetch_payload(
        &self,
        symbol: &str,
        window: &TimeWindow,
    ) -> Result<RawPayload, ProviderError> {
        let url = provider::endpoint(&self.base_url, &[symbol])?;
        let range = window.period.as_deref().unwrap_or(WIDEST_RANGE);
        debug!("Fetching {symbol} from {url} (range {range})");
        let request = self
            .client
            .get(url)
            .query(&[("interval", "1m"), ("range", range)]);

        let response = provider::check_status(request.send().await?).await?;
        let body: YahooResponse = provider::decode_json(response).await?;
        into_payload(body, symbol)
    }
}
