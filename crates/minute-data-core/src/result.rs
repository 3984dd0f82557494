use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candle::Candle;
use crate::window::TimeWindow;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

/// Outcome of fetching one symbol.
///
/// Serializes as `{"status":"ok","count":N,"candles":[...]}` or
/// `{"status":"<code>","message":"..."}`. The failure status is `"error"`
/// unless the provider reported a more specific code (e.g. `"no_data"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SymbolResultRepr", from = "SymbolResultRepr")]
pub enum SymbolResult {
    Ok { candles: Vec<Candle> },
    Error { status: String, message: String },
}

impl SymbolResult {
    pub fn ok(candles: Vec<Candle>) -> Self {
        SymbolResult::Ok { candles }
    }

    /// Failure with the generic `"error"` status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(STATUS_ERROR, message)
    }

    /// Failure carrying a provider's own status code.
    pub fn with_status(status: impl Into<String>, message: impl Into<String>) -> Self {
        SymbolResult::Error {
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> &str {
        match self {
            SymbolResult::Ok { .. } => STATUS_OK,
            SymbolResult::Error { status, .. } => status,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SymbolResult::Ok { .. })
    }

    pub fn candles(&self) -> Option<&[Candle]> {
        match self {
            SymbolResult::Ok { candles } => Some(candles),
            SymbolResult::Error { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SymbolResultRepr {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    candles: Option<Vec<Candle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<SymbolResult> for SymbolResultRepr {
    fn from(result: SymbolResult) -> Self {
        match result {
            SymbolResult::Ok { candles } => SymbolResultRepr {
                status: STATUS_OK.to_string(),
                count: Some(candles.len()),
                candles: Some(candles),
                message: None,
            },
            SymbolResult::Error { status, message } => SymbolResultRepr {
                status,
                count: None,
                candles: None,
                message: Some(message),
            },
        }
    }
}

impl From<SymbolResultRepr> for SymbolResult {
    fn from(repr: SymbolResultRepr) -> Self {
        if repr.status == STATUS_OK {
            return SymbolResult::Ok {
                candles: repr.candles.unwrap_or_default(),
            };
        }
        SymbolResult::Error {
            status: repr.status,
            message: repr.message.unwrap_or_default(),
        }
    }
}

/// Response for one batch: the request echo plus one result per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub requested_minutes: u32,
    pub from: i64,
    pub to: i64,
    pub resolution: String,
    pub symbols: BTreeMap<String, SymbolResult>,
}

impl BatchResponse {
    /// Empty response echoing the request and its window.
    pub fn new(requested_minutes: u32, window: &TimeWindow) -> Self {
        Self {
            requested_minutes,
            from: window.from,
            to: window.to,
            resolution: window.resolution.clone(),
            symbols: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, result: SymbolResult) {
        self.symbols.insert(symbol.into(), result);
    }

    pub fn ok_count(&self) -> usize {
        self.symbols.values().filter(|r| r.is_ok()).count()
    }
}
