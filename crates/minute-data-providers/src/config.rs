use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::alpaca::{AlpacaCredentials, AlpacaProvider};
use crate::error::ProviderError;
use crate::finnhub::FinnhubProvider;
use crate::provider::CandleProvider;
use crate::yahoo::YahooProvider;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Per-call timeout and fan-out cap for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl FetchConfig {
    /// Read `MINUTE_DATA_TIMEOUT_SECS` and `MINUTE_DATA_CONCURRENCY`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                env_parse("MINUTE_DATA_TIMEOUT_SECS")
                    .filter(|s| *s > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            concurrency: env_parse("MINUTE_DATA_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_CONCURRENCY),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Finnhub,
    Alpaca,
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "finnhub" => Ok(ProviderKind::Finnhub),
            "alpaca" => Ok(ProviderKind::Alpaca),
            other => Err(ProviderError::Config(format!(
                "unknown provider: {other}. Expected: yahoo, finnhub, alpaca"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::Finnhub => "finnhub",
            ProviderKind::Alpaca => "alpaca",
        };
        f.write_str(name)
    }
}

/// Provider selection and credentials, captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub alpaca_key_id: Option<String>,
    pub alpaca_secret_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            base_url: None,
            finnhub_api_key: None,
            alpaca_key_id: None,
            alpaca_secret_key: None,
        }
    }

    /// Read credentials and `MINUTE_DATA_BASE_URL` from the environment.
    /// Missing credentials are not an error here.
    pub fn from_env(kind: ProviderKind) -> Self {
        Self {
            kind,
            base_url: env_str("MINUTE_DATA_BASE_URL"),
            finnhub_api_key: env_str("FINNHUB_API_KEY"),
            alpaca_key_id: env_str("ALPACA_API_KEY_ID"),
            alpaca_secret_key: env_str("ALPACA_API_SECRET_KEY"),
        }
    }

    /// Build the configured provider on top of a shared client.
    pub fn build(&self, client: Client) -> Arc<dyn CandleProvider> {
        match self.kind {
            ProviderKind::Yahoo => match &self.base_url {
                Some(url) => Arc::new(YahooProvider::with_base_url(client, url.clone())),
                None => Arc::new(YahooProvider::new(client)),
            },
            ProviderKind::Finnhub => Arc::new(FinnhubProvider::new(
                client,
                self.finnhub_api_key.clone(),
                self.base_url.clone(),
            )),
            ProviderKind::Alpaca => {
                let credentials = match (&self.alpaca_key_id, &self.alpaca_secret_key) {
                    (Some(key_id), Some(secret_key)) => Some(AlpacaCredentials {
                        key_id: key_id.clone(),
                        secret_key: secret_key.clone(),
                    }),
                    _ => None,
                };
                Arc::new(AlpacaProvider::new(client, credentials, self.base_url.clone()))
            }
        }
    }
}

fn env_str(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_str(name).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("Yahoo".parse::<ProviderKind>().unwrap(), ProviderKind::Yahoo);
        assert_eq!(" finnhub ".parse::<ProviderKind>().unwrap(), ProviderKind::Finnhub);
        assert_eq!("ALPACA".parse::<ProviderKind>().unwrap(), ProviderKind::Alpaca);
        assert!("polygon".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_display_round_trips() {
        for kind in [ProviderKind::Yahoo, ProviderKind::Finnhub, ProviderKind::Alpaca] {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn build_selects_provider() {
        let client = Client::new();
        let mut config = ProviderConfig::new(ProviderKind::Finnhub);
        assert_eq!(config.build(client.clone()).name(), "finnhub");

        config.kind = ProviderKind::Yahoo;
        assert_eq!(config.build(client.clone()).name(), "yahoo");

        config.kind = ProviderKind::Alpaca;
        assert_eq!(config.build(client).name(), "alpaca");
    }

    #[test]
    fn build_without_credentials_defers_error() {
        let client = Client::new();
        let finnhub = ProviderConfig::new(ProviderKind::Finnhub).build(client.clone());
        assert!(finnhub.check_config().is_err());

        let mut alpaca = ProviderConfig::new(ProviderKind::Alpaca);
        alpaca.alpaca_key_id = Some("id".into());
        assert!(alpaca.build(client.clone()).check_config().is_err());

        alpaca.alpaca_secret_key = Some("secret".into());
        assert!(alpaca.build(client).check_config().is_ok());
    }
}
