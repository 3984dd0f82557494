use serde::{Deserialize, Serialize};

/// A single 1-minute OHLCV candle.
/// `timestamp` is the bucket start in Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Keep only the most recent `limit` candles.
/// Providers that serve fixed periods return more than was asked for.
pub fn keep_latest(candles: &mut Vec<Candle>, limit: usize) {
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
}
