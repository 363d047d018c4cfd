use crate::domain::errors::ForecastError;
use crate::domain::ml::FeatureRow;

/// A fitted regression model mapping feature rows to prices.
///
/// Immutable once fitted; shared across threads by the forecaster.
pub trait Regressor: Send + Sync {
    /// One predicted price per input row, in input order
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ForecastError>;
}

/// Interface for Machine Learning model families
pub trait Learner: Send + Sync {
    /// Fit a fresh model on `rows` labelled with `targets`
    fn fit(&self, rows: &[FeatureRow], targets: &[f64]) -> Result<Box<dyn Regressor>, ForecastError>;

    /// Get model name/type
    fn name(&self) -> &str;
}
