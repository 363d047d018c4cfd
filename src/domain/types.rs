use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored gas price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sequence id assigned by the store, increasing with every append
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Gas price in gwei
    #[serde(rename = "gas_price")]
    pub price: f64,
}

/// A predicted price. Never written back to a price store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "gas_price")]
    pub price: f64,
}

/// Outcome of a `train()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainResult {
    /// False when the history was below the minimum sample threshold
    pub trained: bool,
    pub sample_count: usize,
    pub row_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NoModel,
    InsufficientHistory { available: usize, required: usize },
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::NoModel => write!(f, "no trained model"),
            UnavailableReason::InsufficientHistory {
                available,
                required,
            } => write!(
                f,
                "insufficient history ({} samples, {} required)",
                available, required
            ),
        }
    }
}

/// Result of a forecast request.
///
/// `Unavailable` is the normal answer while the system is still collecting data,
/// and callers are forced to handle it before touching any points.
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Available(Vec<ForecastPoint>),
    Unavailable(UnavailableReason),
}

impl Forecast {
    pub fn is_available(&self) -> bool {
        matches!(self, Forecast::Available(_))
    }

    pub fn points(&self) -> Option<&[ForecastPoint]> {
        match self {
            Forecast::Available(points) => Some(points),
            Forecast::Unavailable(_) => None,
        }
    }
}
