use chrono::{DateTime, Utc};

/// A provider-defined retention tier, e.g. Yahoo's `5d` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBucket {
    pub label: &'static str,
    /// Largest lookback (in minutes) this bucket covers.
    pub max_minutes: u32,
}

/// What a provider can serve at 1-minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLimits {
    /// Lookbacks beyond this are clamped.
    pub max_lookback_minutes: u32,
    /// Resolution label echoed back in responses.
    pub resolution: &'static str,
    /// Period buckets in ascending order. Empty when the provider takes absolute ranges.
    pub buckets: &'static [PeriodBucket],
}

/// Absolute time range for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start, epoch seconds.
    pub from: i64,
    /// End, epoch seconds. "Now" at batch start.
    pub to: i64,
    pub resolution: String,
    /// Chosen period bucket, if the provider uses them.
    pub period: Option<String>,
    /// Lookback after clamping to the provider's retention.
    pub lookback_minutes: u32,
}

impl ProviderLimits {
    /// Smallest bucket covering `lookback_minutes`, or the largest bucket when none does.
    pub fn bucket_for(&self, lookback_minutes: u32) -> Option<&PeriodBucket> {
        self.buckets
            .iter()
            .find(|b| lookback_minutes <= b.max_minutes)
            .or_else(|| self.buckets.last())
    }
}

impl TimeWindow {
    /// Derive the window for a lookback ending at `now`.
    pub fn compute(lookback_minutes: u32, limits: &ProviderLimits, now: DateTime<Utc>) -> Self {
        let lookback_minutes = lookback_minutes.clamp(1, limits.max_lookback_minutes.max(1));
        let to = now.timestamp();
        let from = to - i64::from(lookback_minutes) * 60;

        Self {
            from,
            to,
            resolution: limits.resolution.to_string(),
            period: limits
                .bucket_for(lookback_minutes)
                .map(|b| b.label.to_string()),
            lookback_minutes,
        }
    }
}
