//! Lagged-feature construction for gas price regression.
//!
//! Training rows come from a sliding window over an oldest-first series; the
//! input slice is never shifted or mutated. Inference rows are built from the
//! most-recent-first lag buffer maintained by the rollout.

use crate::domain::errors::ForecastError;
use crate::domain::ml::FeatureRow;
use crate::domain::types::Sample;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Builds `(row, target)` pairs from samples in strictly increasing timestamp order.
    ///
    /// Produces exactly `max(0, n - lag_count)` rows: the first `lag_count` samples
    /// only ever serve as lags.
    pub fn build_training_set(
        samples: &[Sample],
        lag_count: usize,
    ) -> Result<Vec<(FeatureRow, f64)>, ForecastError> {
        if lag_count == 0 {
            return Err(ForecastError::InvalidLagCount);
        }
        ensure_increasing(samples)?;

        let rows = samples
            .windows(lag_count + 1)
            .map(|window| {
                let target = &window[lag_count];
                // window[..lag_count] is oldest-first; lag_1 is the sample right before the target
                let lags = window[..lag_count].iter().rev().map(|s| s.price).collect();
                (temporal_row(target.timestamp, lags), target.price)
            })
            .collect();

        Ok(rows)
    }

    /// Builds the model input for the instant `at_time + step_index * step_interval_minutes`.
    ///
    /// `recent_prices` is most-recent-first and must hold exactly as many prices as the
    /// model has lags.
    pub fn build_prediction_features(
        recent_prices: &[f64],
        lag_count: usize,
        at_time: DateTime<Utc>,
        step_index: u32,
        step_interval_minutes: u32,
    ) -> Result<FeatureRow, ForecastError> {
        if lag_count == 0 {
            return Err(ForecastError::InvalidLagCount);
        }
        if recent_prices.len() != lag_count {
            return Err(ForecastError::LagLengthMismatch {
                expected: lag_count,
                actual: recent_prices.len(),
            });
        }

        let projected = project(at_time, step_index, step_interval_minutes)?;
        Ok(temporal_row(projected, recent_prices.to_vec()))
    }
}

/// `at_time` advanced by `step_index` intervals. Calendar arithmetic handles the
/// hour wrap and the day-of-week rollover at midnight.
pub fn project(
    at_time: DateTime<Utc>,
    step_index: u32,
    step_interval_minutes: u32,
) -> Result<DateTime<Utc>, ForecastError> {
    i64::from(step_index)
        .checked_mul(i64::from(step_interval_minutes))
        .and_then(Duration::try_minutes)
        .and_then(|offset| at_time.checked_add_signed(offset))
        .ok_or(ForecastError::HorizonOutOfRange {
            step_index,
            step_interval_minutes,
        })
}

fn temporal_row(timestamp: DateTime<Utc>, lags: Vec<f64>) -> FeatureRow {
    FeatureRow {
        hour: timestamp.hour(),
        day_of_week: timestamp.weekday().num_days_from_monday(),
        lags,
    }
}

fn ensure_increasing(samples: &[Sample]) -> Result<(), ForecastError> {
    for (i, pair) in samples.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(ForecastError::InvalidOrder {
                index: i + 1,
                previous: pair[0].timestamp,
                timestamp: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(prices: &[f64], start: DateTime<Utc>, interval_minutes: i64) -> Vec<Sample> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Sample {
                id: i as i64 + 1,
                timestamp: start + Duration::minutes(interval_minutes * i as i64),
                price,
            })
            .collect()
    }

    /// Small LCG so the property tests stay deterministic without extra dependencies.
    fn pseudo_random_prices(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                1.0 + (state >> 33) as f64 / (1u64 << 31) as f64 * 100.0
            })
            .collect()
    }

    #[test]
    fn test_row_count_law() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for n in 0..15 {
            let samples = series(&pseudo_random_prices(n as u64, n), start, 30);
            for k in 1..8 {
                let rows = FeatureBuilder::build_training_set(&samples, k).unwrap();
                assert_eq!(rows.len(), n.saturating_sub(k), "n={} k={}", n, k);
            }
        }
    }

    #[test]
    fn test_training_rows_are_deterministic() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 7, 13, 0).unwrap();
        for seed in 1..20u64 {
            let samples = series(&pseudo_random_prices(seed, 40), start, 17);
            let first = FeatureBuilder::build_training_set(&samples, 5).unwrap();
            let second = FeatureBuilder::build_training_set(&samples, 5).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_lags_are_most_recent_first() {
        // 2024-03-02 is a Saturday
        let start = Utc.with_ymd_and_hms(2024, 3, 2, 22, 0, 0).unwrap();
        let samples = series(&[10.0, 11.0, 9.0, 12.0, 13.0], start, 30);

        let rows = FeatureBuilder::build_training_set(&samples, 3).unwrap();
        assert_eq!(rows.len(), 2);

        let (row, target) = &rows[0];
        assert_eq!(*target, 12.0);
        assert_eq!(row.lags, vec![9.0, 11.0, 10.0]);
        assert_eq!(row.hour, 23);
        assert_eq!(row.day_of_week, 5);

        let (row, target) = &rows[1];
        assert_eq!(*target, 13.0);
        assert_eq!(row.lags, vec![12.0, 9.0, 11.0]);
    }

    #[test]
    fn test_out_of_order_input_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut samples = series(&[1.0, 2.0, 3.0, 4.0], start, 30);
        samples.swap(1, 2);

        let err = FeatureBuilder::build_training_set(&samples, 2).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidOrder { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_timestamps_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut samples = series(&[1.0, 2.0, 3.0], start, 30);
        samples[2].timestamp = samples[1].timestamp;

        let err = FeatureBuilder::build_training_set(&samples, 1).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidOrder { index: 2, .. }));
    }

    #[test]
    fn test_most_recent_first_input_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut samples = series(&[1.0, 2.0, 3.0], start, 30);
        samples.reverse();

        assert!(FeatureBuilder::build_training_set(&samples, 1).is_err());
    }

    #[test]
    fn test_zero_lag_count_rejected() {
        let err = FeatureBuilder::build_training_set(&[], 0).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidLagCount));
    }

    #[test]
    fn test_prediction_features_roll_over_midnight() {
        // Saturday 23:00, two 30-minute steps -> Sunday 00:00
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 23, 0, 0).unwrap();
        let row = FeatureBuilder::build_prediction_features(
            &[5.0, 4.0, 3.0, 2.0, 1.0],
            5,
            at,
            2,
            30,
        )
        .unwrap();

        assert_eq!(row.hour, 0);
        assert_eq!(row.day_of_week, 6);
        assert_eq!(row.lags, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_prediction_features_same_day() {
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 23, 0, 0).unwrap();
        let row = FeatureBuilder::build_prediction_features(&[1.0], 1, at, 1, 30).unwrap();

        assert_eq!(row.hour, 23);
        assert_eq!(row.day_of_week, 5);
    }

    #[test]
    fn test_prediction_features_sunday_wraps_to_monday() {
        // Sunday 22:30 + 90 minutes -> Monday 00:00
        let at = Utc.with_ymd_and_hms(2024, 3, 3, 22, 30, 0).unwrap();
        let row = FeatureBuilder::build_prediction_features(&[1.0], 1, at, 3, 30).unwrap();

        assert_eq!(row.hour, 0);
        assert_eq!(row.day_of_week, 0);
    }

    #[test]
    fn test_prediction_features_partial_hour_crossing() {
        // 23:45 + 30 minutes crosses midnight even though the whole-hour delta is zero
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 23, 45, 0).unwrap();
        let row = FeatureBuilder::build_prediction_features(&[1.0], 1, at, 1, 30).unwrap();

        assert_eq!(row.hour, 0);
        assert_eq!(row.day_of_week, 6);
    }

    #[test]
    fn test_prediction_features_multi_day_horizon() {
        // Friday 12:00 + 100 hours -> Tuesday 16:00
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let row = FeatureBuilder::build_prediction_features(&[1.0], 1, at, 200, 30).unwrap();

        assert_eq!(row.hour, 16);
        assert_eq!(row.day_of_week, 1);
    }

    #[test]
    fn test_prediction_features_require_exact_lag_length() {
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 23, 0, 0).unwrap();
        let err = FeatureBuilder::build_prediction_features(&[1.0, 2.0], 5, at, 1, 30).unwrap_err();

        assert!(matches!(
            err,
            ForecastError::LagLengthMismatch {
                expected: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_projection_past_time_range_is_an_error() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let err = FeatureBuilder::build_prediction_features(&[1.0], 1, at, 40, u32::MAX).unwrap_err();

        assert!(matches!(
            err,
            ForecastError::HorizonOutOfRange {
                step_index: 40,
                step_interval_minutes: u32::MAX
            }
        ));
        assert!(project(at, u32::MAX, u32::MAX).is_err());
    }
}
