use std::time::Duration;

use async_trait::async_trait;
use minute_data_core::normalize::RawPayload;
use minute_data_core::window::{ProviderLimits, TimeWindow};
use reqwest::{Client, Response, StatusCode, Url};

use crate::error::ProviderError;

const USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Trait for fetching 1-minute candle payloads from an external source.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Retention and granularity constraints used to build the request window.
    fn limits(&self) -> ProviderLimits;

    /// Verify required credentials are present. Called once per batch.
    fn check_config(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Issue one request for `symbol` covering `window` and unwrap the
    /// provider envelope. HTTP status and provider failure markers are
    /// checked here; numeric coercion is left to the normalizer.
    async fn fetch_payload(
        &self,
        symbol: &str,
        window: &TimeWindow,
    ) -> Result<RawPayload, ProviderError>;
}

/// Build the HTTP client shared by every provider request.
/// Cloning it shares the connection pool.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Append path segments to `base`. Each segment is percent-encoded, so a
/// symbol containing `/`, `?` or `#` stays a single segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base)
        .map_err(|e| ProviderError::Config(format!("invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Config(format!("base URL cannot take a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn 429 and other non-success statuses into errors.
pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(ProviderError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status,
            message: body,
        });
    }

    Ok(response)
}

/// Read the body as text and decode it, so decode failures carry serde's message.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ProviderError> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))
}
