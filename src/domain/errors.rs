use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the forecasting core (feature construction, training, rollout)
/// and by price stores when a caller violates their contract.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(
        "Samples out of order at index {index}: {timestamp} does not follow {previous} as required"
    )]
    InvalidOrder {
        index: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("No usable feature rows from {samples} samples with lag count {lag_count}")]
    InsufficientFeatureRows { samples: usize, lag_count: usize },

    #[error("Expected exactly {expected} recent prices, got {actual}")]
    LagLengthMismatch { expected: usize, actual: usize },

    #[error("Lag count must be at least 1")]
    InvalidLagCount,

    #[error("Forecast horizon must be at least one step")]
    InvalidSteps,

    #[error(
        "Step {step_index} at {step_interval_minutes} minute intervals lies outside the representable time range"
    )]
    HorizonOutOfRange {
        step_index: u32,
        step_interval_minutes: u32,
    },

    #[error("Invalid price {price}: must be finite and positive")]
    InvalidPrice { price: f64 },

    #[error("Model failure: {reason}")]
    Model { reason: String },
}

impl ForecastError {
    pub fn model(reason: impl std::fmt::Display) -> Self {
        Self::Model {
            reason: reason.to_string(),
        }
    }
}
