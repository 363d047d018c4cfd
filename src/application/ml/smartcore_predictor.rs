use super::predictor::{Learner, Regressor};
use crate::domain::errors::ForecastError;
use crate::domain::ml::FeatureRow;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest learner backed by smartcore.
pub struct RandomForestLearner {
    params: RandomForestRegressorParameters,
    n_trees: usize,
}

impl RandomForestLearner {
    pub fn new(n_trees: usize, seed: u64) -> Self {
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees)
            .with_seed(seed);
        Self { params, n_trees }
    }
}

impl Default for RandomForestLearner {
    fn default() -> Self {
        Self::new(100, 42)
    }
}

fn to_matrix(rows: &[FeatureRow]) -> Result<DenseMatrix<f64>, ForecastError> {
    let x: Vec<Vec<f64>> = rows.iter().map(FeatureRow::to_f64_vector).collect();
    DenseMatrix::from_2d_vec(&x).map_err(|e| ForecastError::model(format!("Matrix creation failed: {}", e)))
}

impl Learner for RandomForestLearner {
    fn fit(&self, rows: &[FeatureRow], targets: &[f64]) -> Result<Box<dyn Regressor>, ForecastError> {
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(ForecastError::model(format!(
                "{} rows for {} targets",
                rows.len(),
                targets.len()
            )));
        }

        let lag_count = rows[0].lag_count();
        if let Some(ragged) = rows.iter().find(|row| row.lag_count() != lag_count) {
            return Err(ForecastError::LagLengthMismatch {
                expected: lag_count,
                actual: ragged.lag_count(),
            });
        }

        let x = to_matrix(rows)?;
        let y = targets.to_vec();
        let model = Forest::fit(&x, &y, self.params.clone())
            .map_err(|e| ForecastError::model(format!("Training error: {}", e)))?;

        debug!(
            "Random forest fitted on {} rows ({} trees)",
            rows.len(),
            self.n_trees
        );
        Ok(Box::new(SmartCoreRegressor { model, lag_count }))
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }
}

struct SmartCoreRegressor {
    model: Forest,
    /// Lag columns the forest was fitted on
    lag_count: usize,
}

impl Regressor for SmartCoreRegressor {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ForecastError> {
        if let Some(row) = rows.iter().find(|row| row.lag_count() != self.lag_count) {
            return Err(ForecastError::LagLengthMismatch {
                expected: self.lag_count,
                actual: row.lag_count(),
            });
        }

        let x = to_matrix(rows)?;
        self.model
            .predict(&x)
            .map_err(|e| ForecastError::model(format!("Prediction failed: {}", e)))
    }
}
