use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::candle::Candle;
use crate::error::MarketDataError;

/// Turn a raw payload into candles, preserving provider order.
pub trait Normalize {
    fn normalize(&self) -> Result<Vec<Candle>, MarketDataError>;
}

/// Column-per-field payload (Yahoo `indicators.quote`, Finnhub `t/o/h/l/c/v`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelArrayShape {
    pub timestamps: Vec<Value>,
    pub opens: Vec<Value>,
    pub highs: Vec<Value>,
    pub lows: Vec<Value>,
    pub closes: Vec<Value>,
    pub volumes: Vec<Value>,
}

/// One record per time point (Alpaca bars).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRow {
    #[serde(alias = "t")]
    pub timestamp: Value,
    #[serde(alias = "o")]
    pub open: Value,
    #[serde(alias = "h")]
    pub high: Value,
    #[serde(alias = "l")]
    pub low: Value,
    #[serde(alias = "c")]
    pub close: Value,
    #[serde(default, alias = "v")]
    pub volume: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RowOrientedShape {
    pub rows: Vec<RawRow>,
}

/// A provider payload in one of the supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    ParallelArrays(ParallelArrayShape),
    Rows(RowOrientedShape),
}

impl RawPayload {
    /// Number of time points in the payload, before any gap filtering.
    pub fn len(&self) -> usize {
        match self {
            RawPayload::ParallelArrays(shape) => shape.timestamps.len(),
            RawPayload::Rows(shape) => shape.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Normalize for RawPayload {
    fn normalize(&self) -> Result<Vec<Candle>, MarketDataError> {
        match self {
            RawPayload::ParallelArrays(shape) => shape.normalize(),
            RawPayload::Rows(shape) => shape.normalize(),
        }
    }
}

impl ParallelArrayShape {
    fn check_aligned(&self) -> Result<(), MarketDataError> {
        let expected = self.timestamps.len();
        let fields = [
            ("open", self.opens.len()),
            ("high", self.highs.len()),
            ("low", self.lows.len()),
            ("close", self.closes.len()),
            ("volume", self.volumes.len()),
        ];
        for (field, found) in fields {
            if found != expected {
                return Err(MarketDataError::MisalignedArrays {
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

impl Normalize for ParallelArrayShape {
    fn normalize(&self) -> Result<Vec<Candle>, MarketDataError> {
        self.check_aligned()?;

        let mut candles = Vec::with_capacity(self.timestamps.len());
        for i in 0..self.timestamps.len() {
            let point = RawPoint {
                timestamp: &self.timestamps[i],
                open: &self.opens[i],
                high: &self.highs[i],
                low: &self.lows[i],
                close: &self.closes[i],
                volume: &self.volumes[i],
            };
            if let Some(candle) = point.to_candle(i)? {
                candles.push(candle);
            }
        }
        Ok(candles)
    }
}

impl Normalize for RowOrientedShape {
    fn normalize(&self) -> Result<Vec<Candle>, MarketDataError> {
        let mut candles = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let point = RawPoint {
                timestamp: &row.timestamp,
                open: &row.open,
                high: &row.high,
                low: &row.low,
                close: &row.close,
                volume: &row.volume,
            };
            if let Some(candle) = point.to_candle(i)? {
                candles.push(candle);
            }
        }
        Ok(candles)
    }
}

/// Borrowed view of one time point, whichever shape it came from.
struct RawPoint<'a> {
    timestamp: &'a Value,
    open: &'a Value,
    high: &'a Value,
    low: &'a Value,
    close: &'a Value,
    volume: &'a Value,
}

impl RawPoint<'_> {
    /// `Ok(None)` for gap rows where every price is null.
    fn to_candle(&self, index: usize) -> Result<Option<Candle>, MarketDataError> {
        let timestamp = coerce_timestamp(index, self.timestamp)?;
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().all(|v| v.is_null()) {
            return Ok(None);
        }

        Ok(Some(Candle {
            timestamp,
            open: coerce_price("open", index, self.open)?,
            high: coerce_price("high", index, self.high)?,
            low: coerce_price("low", index, self.low)?,
            close: coerce_price("close", index, self.close)?,
            volume: coerce_volume(index, self.volume)?,
        }))
    }
}

fn invalid(field: &'static str, index: usize, value: &Value) -> MarketDataError {
    MarketDataError::InvalidValue {
        field,
        index,
        value: value.to_string(),
    }
}

fn coerce_price(field: &'static str, index: usize, value: &Value) -> Result<f64, MarketDataError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(field, index, value))
}

fn coerce_volume(index: usize, value: &Value) -> Result<i64, MarketDataError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .ok_or_else(|| invalid("volume", index, value)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("volume", index, value)),
        _ => Err(invalid("volume", index, value)),
    }
}

fn coerce_timestamp(index: usize, value: &Value) -> Result<i64, MarketDataError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid("timestamp", index, value)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .map_err(|_| invalid("timestamp", index, value)),
        _ => Err(invalid("timestamp", index, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> Vec<Value> {
        v.as_array().unwrap().clone()
    }

    fn three_point_arrays() -> ParallelArrayShape {
        ParallelArrayShape {
            timestamps: values(json!([1736942400, 1736942460, 1736942520])),
            opens: values(json!([150.12, 150.99, 151.0])),
            highs: values(json!([151.5, 152.0, 152.5])),
            lows: values(json!([149.0, 150.5, 150.75])),
            closes: values(json!([150.99, 151.75, 152.25])),
            volumes: values(json!([1000, 2000, 3000])),
        }
    }

    #[test]
    fn parallel_arrays_preserve_index_order() {
        let candles = three_point_arrays().normalize().unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(
            candles[0],
            Candle {
                timestamp: 1736942400,
                open: 150.12,
                high: 151.5,
                low: 149.0,
                close: 150.99,
                volume: 1000,
            }
        );
        assert_eq!(candles[1].timestamp, 1736942460);
        assert_eq!(candles[1].close, 151.75);
        assert_eq!(candles[2].open, 151.0);
        assert_eq!(candles[2].volume, 3000);
    }

    #[test]
    fn parallel_arrays_misaligned_fails() {
        let mut shape = three_point_arrays();
        shape.volumes.pop();

        let err = shape.normalize().unwrap_err();
        assert_eq!(
            err,
            MarketDataError::MisalignedArrays {
                field: "volume",
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn parallel_arrays_longer_price_array_fails() {
        let mut shape = three_point_arrays();
        shape.highs.push(json!(1.0));
        assert!(matches!(
            shape.normalize(),
            Err(MarketDataError::MisalignedArrays { field: "high", .. })
        ));
    }

    #[test]
    fn gap_rows_skipped() {
        let mut shape = three_point_arrays();
        shape.opens[1] = Value::Null;
        shape.highs[1] = Value::Null;
        shape.lows[1] = Value::Null;
        shape.closes[1] = Value::Null;
        shape.volumes[1] = Value::Null;

        let candles = shape.normalize().unwrap();
        let ts: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![1736942400, 1736942520]);
    }

    #[test]
    fn gap_row_with_bad_timestamp_fails() {
        let mut shape = three_point_arrays();
        shape.timestamps[1] = json!("not a time");
        shape.opens[1] = Value::Null;
        shape.highs[1] = Value::Null;
        shape.lows[1] = Value::Null;
        shape.closes[1] = Value::Null;

        assert!(matches!(
            shape.normalize(),
            Err(MarketDataError::InvalidValue { field: "timestamp", index: 1, .. })
        ));
    }

    #[test]
    fn partial_null_row_fails() {
        let mut shape = three_point_arrays();
        shape.closes[2] = Value::Null;

        let err = shape.normalize().unwrap_err();
        assert_eq!(
            err,
            MarketDataError::InvalidValue {
                field: "close",
                index: 2,
                value: "null".into(),
            }
        );
    }

    #[test]
    fn non_numeric_price_fails() {
        let mut shape = three_point_arrays();
        shape.opens[0] = json!("abc");
        assert!(matches!(
            shape.normalize(),
            Err(MarketDataError::InvalidValue { field: "open", index: 0, .. })
        ));
    }

    #[test]
    fn numeric_strings_coerced() {
        let mut shape = three_point_arrays();
        shape.opens[0] = json!("150.50");
        shape.volumes[0] = json!("1200");

        let candles = shape.normalize().unwrap();
        assert_eq!(candles[0].open, 150.5);
        assert_eq!(candles[0].volume, 1200);
    }

    #[test]
    fn float_volume_truncated() {
        let mut shape = three_point_arrays();
        shape.volumes[0] = json!(1500.0);
        let candles = shape.normalize().unwrap();
        assert_eq!(candles[0].volume, 1500);
    }

    #[test]
    fn null_volume_is_zero() {
        let mut shape = three_point_arrays();
        shape.volumes[0] = Value::Null;
        let candles = shape.normalize().unwrap();
        assert_eq!(candles[0].volume, 0);
    }

    #[test]
    fn fractional_timestamp_fails() {
        let mut shape = three_point_arrays();
        shape.timestamps[1] = json!(1736942460.5);
        assert!(matches!(
            shape.normalize(),
            Err(MarketDataError::InvalidValue { field: "timestamp", index: 1, .. })
        ));
    }

    #[test]
    fn rows_short_field_names() {
        let json = r#"[
            {"t": "2025-01-15T14:30:00Z", "o": 150.12, "h": 151.50, "l": 149.00, "c": 150.99, "v": 1000, "n": 12, "vw": 150.4},
            {"t": "2025-01-15T14:31:00Z", "o": 150.99, "h": 152.00, "l": 150.50, "c": 151.75, "v": 2000, "n": 20, "vw": 151.1}
        ]"#;
        let shape: RowOrientedShape = serde_json::from_str(json).unwrap();
        let candles = shape.normalize().unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1736951400);
        assert_eq!(candles[0].high, 151.5);
        assert_eq!(candles[1].timestamp, 1736951460);
        assert_eq!(candles[1].volume, 2000);
    }

    #[test]
    fn rows_long_field_names_and_epoch() {
        let json = r#"[
            {"timestamp": 1736942400, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 7}
        ]"#;
        let shape: RowOrientedShape = serde_json::from_str(json).unwrap();
        let candles = shape.normalize().unwrap();
        assert_eq!(candles[0].timestamp, 1736942400);
        assert_eq!(candles[0].volume, 7);
    }

    #[test]
    fn rows_bad_timestamp_fails() {
        let json = r#"[
            {"t": "yesterday", "o": 1.0, "h": 2.0, "l": 0.5, "c": 1.5, "v": 7}
        ]"#;
        let shape: RowOrientedShape = serde_json::from_str(json).unwrap();
        assert!(matches!(
            shape.normalize(),
            Err(MarketDataError::InvalidValue { field: "timestamp", index: 0, .. })
        ));
    }

    #[test]
    fn rows_missing_price_field_rejected_at_decode() {
        let json = r#"[{"t": 1736942400, "o": 1.0, "h": 2.0, "l": 0.5, "v": 7}]"#;
        assert!(serde_json::from_str::<RowOrientedShape>(json).is_err());
    }

    #[test]
    fn rows_keep_provider_order() {
        let json = r#"[
            {"t": 1736942520, "o": 1.0, "h": 1.0, "l": 1.0, "c": 1.0, "v": 1},
            {"t": 1736942400, "o": 2.0, "h": 2.0, "l": 2.0, "c": 2.0, "v": 2}
        ]"#;
        let shape: RowOrientedShape = serde_json::from_str(json).unwrap();
        let candles = shape.normalize().unwrap();
        assert_eq!(candles[0].timestamp, 1736942520);
        assert_eq!(candles[1].timestamp, 1736942400);
    }

    #[test]
    fn payload_dispatches_by_shape() {
        let arrays = RawPayload::ParallelArrays(three_point_arrays());
        assert_eq!(arrays.len(), 3);
        assert_eq!(arrays.normalize().unwrap().len(), 3);

        let rows = RawPayload::Rows(RowOrientedShape::default());
        assert!(rows.is_empty());
        assert!(rows.normalize().unwrap().is_empty());
    }
}
