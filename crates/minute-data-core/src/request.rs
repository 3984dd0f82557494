use crate::error::MarketDataError;

/// Smallest lookback a batch may ask for, in minutes.
pub const MIN_LOOKBACK_MINUTES: u32 = 1;
/// Largest lookback a batch may ask for (3 days), in minutes.
pub const MAX_LOOKBACK_MINUTES: u32 = 4320;
/// Lookback used when the caller gives none.
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 60;

/// Split a comma-separated symbol list into trimmed, uppercased symbols.
/// Empty tokens are dropped; duplicates are kept in input order.
pub fn parse_symbols(raw: &str) -> Result<Vec<String>, MarketDataError> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(MarketDataError::NoSymbols);
    }
    Ok(symbols)
}

pub fn validate_lookback(minutes: u32) -> Result<u32, MarketDataError> {
    if (MIN_LOOKBACK_MINUTES..=MAX_LOOKBACK_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(MarketDataError::LookbackOutOfRange {
            requested: minutes,
            min: MIN_LOOKBACK_MINUTES,
            max: MAX_LOOKBACK_MINUTES,
        })
    }
}
