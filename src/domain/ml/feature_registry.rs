/// Temporal columns that precede the lag columns in every model input.
pub const TEMPORAL_FEATURE_NAMES: &[&str] = &["hour", "day_of_week"];

/// One model input: calendar position of the target instant plus the k prices before it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Hour of day in UTC, 0..24
    pub hour: u32,
    /// Day of week, Monday = 0 .. Sunday = 6
    pub day_of_week: u32,
    /// `lags[0]` is lag_1 (most recent prior price), `lags[k-1]` is lag_k (oldest)
    pub lags: Vec<f64>,
}

impl FeatureRow {
    pub fn lag_count(&self) -> usize {
        self.lags.len()
    }

    /// Flattens the row in model column order: hour, day_of_week, lag_1..lag_k.
    /// Any change here is a breaking change for fitted models.
    pub fn to_f64_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(TEMPORAL_FEATURE_NAMES.len() + self.lags.len());
        v.push(self.hour as f64);
        v.push(self.day_of_week as f64);
        v.extend_from_slice(&self.lags);
        v
    }
}

/// Column names for a model built with `lag_count` lags.
pub fn feature_names(lag_count: usize) -> Vec<String> {
    TEMPORAL_FEATURE_NAMES
        .iter()
        .map(|name| name.to_string())
        .chain((1..=lag_count).map(|i| format!("lag_{}", i)))
        .collect()
}
