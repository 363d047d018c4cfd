//! Model ownership, training and autoregressive rollout.
//!
//! The forecaster holds at most one trained model behind an `Arc`. Training
//! fits a brand new model outside any lock and publishes it with a single
//! pointer swap, so concurrent `predict_next` calls run against either the
//! previous model or the new one in full.
//!
//! Forecasts are anchored at the timestamp of the latest stored sample. Step
//! `i` (zero based) is emitted at `anchor + (i + 1) * step_interval`.

use super::feature_builder::{FeatureBuilder, project};
use super::predictor::{Learner, Regressor};
use crate::domain::errors::ForecastError;
use crate::domain::ml::feature_registry::feature_names;
use crate::domain::types::{Forecast, ForecastPoint, Sample, TrainResult, UnavailableReason};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Horizons past this grow the output incrementally.
const MAX_PREALLOCATED_STEPS: usize = 1024;

/// A fitted regressor together with the shape of the data it was fitted on.
pub struct TrainedModel {
    regressor: Box<dyn Regressor>,
    lag_count: usize,
    sample_count: usize,
    row_count: usize,
    trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn lag_count(&self) -> usize {
        self.lag_count
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

pub struct Forecaster {
    learner: Arc<dyn Learner>,
    step_interval_minutes: u32,
    model: RwLock<Option<Arc<TrainedModel>>>,
}

impl Forecaster {
    pub fn new(learner: Arc<dyn Learner>, step_interval_minutes: u32) -> Self {
        Self {
            learner,
            step_interval_minutes,
            model: RwLock::new(None),
        }
    }

    /// Snapshot of the currently published model.
    pub fn current_model(&self) -> Option<Arc<TrainedModel>> {
        let guard = match self.model.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("Forecaster: model lock poisoned during read, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    pub fn is_trained(&self) -> bool {
        self.current_model().is_some()
    }

    fn publish(&self, model: Option<Arc<TrainedModel>>) {
        let mut guard = match self.model.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("Forecaster: model lock poisoned during write, recovering");
                poisoned.into_inner()
            }
        };
        *guard = model;
    }

    /// Fits a new model on `history` (oldest first) and replaces the current one.
    ///
    /// Below `min_samples` this is not an error: the held model is dropped and
    /// `trained` is false, so forecasts report `Unavailable` until enough data exists.
    pub fn train(
        &self,
        history: &[Sample],
        lag_count: usize,
        min_samples: usize,
    ) -> Result<TrainResult, ForecastError> {
        if history.len() < min_samples {
            warn!(
                "Not enough data to train model: {} samples found, {} required",
                history.len(),
                min_samples
            );
            self.publish(None);
            return Ok(TrainResult {
                trained: false,
                sample_count: history.len(),
                row_count: 0,
            });
        }

        let training_set = FeatureBuilder::build_training_set(history, lag_count)?;
        if training_set.is_empty() {
            return Err(ForecastError::InsufficientFeatureRows {
                samples: history.len(),
                lag_count,
            });
        }

        let (rows, targets): (Vec<_>, Vec<_>) = training_set.into_iter().unzip();
        debug!("Fitting on columns {:?}", feature_names(lag_count));
        let regressor = self.learner.fit(&rows, &targets)?;

        let model = TrainedModel {
            regressor,
            lag_count,
            sample_count: history.len(),
            row_count: rows.len(),
            trained_at: Utc::now(),
        };
        self.publish(Some(Arc::new(model)));

        info!(
            "{} trained with {} rows from {} samples (lags: {})",
            self.learner.name(),
            rows.len(),
            history.len(),
            lag_count
        );

        Ok(TrainResult {
            trained: true,
            sample_count: history.len(),
            row_count: rows.len(),
        })
    }

    /// Rolls the published model forward `steps` intervals past the latest sample.
    ///
    /// `recent` is the store's most-recent-first window; only its first `lag_count`
    /// samples are used. Each prediction is fed back as `lag_1` for the next step,
    /// so errors compound across the horizon. Predictions are not clamped.
    pub fn predict_next(&self, recent: &[Sample], steps: usize) -> Result<Forecast, ForecastError> {
        if steps == 0 {
            return Err(ForecastError::InvalidSteps);
        }

        let Some(model) = self.current_model() else {
            return Ok(Forecast::Unavailable(UnavailableReason::NoModel));
        };

        self.rollout(&model, recent, steps)
    }

    /// Rollout against a specific model snapshot, for callers that sized `recent`
    /// from that snapshot's lag count.
    pub fn rollout(
        &self,
        model: &TrainedModel,
        recent: &[Sample],
        steps: usize,
    ) -> Result<Forecast, ForecastError> {
        if steps == 0 {
            return Err(ForecastError::InvalidSteps);
        }

        let lag_count = model.lag_count;
        if recent.len() < lag_count {
            return Ok(Forecast::Unavailable(
                UnavailableReason::InsufficientHistory {
                    available: recent.len(),
                    required: lag_count,
                },
            ));
        }

        let window = &recent[..lag_count];
        for (i, pair) in window.windows(2).enumerate() {
            if pair[1].timestamp >= pair[0].timestamp {
                return Err(ForecastError::InvalidOrder {
                    index: i + 1,
                    previous: pair[0].timestamp,
                    timestamp: pair[1].timestamp,
                });
            }
        }

        let anchor = window[0].timestamp;
        let mut lags: VecDeque<f64> = window.iter().map(|s| s.price).collect();
        let mut points = Vec::with_capacity(steps.min(MAX_PREALLOCATED_STEPS));

        for step in 0..steps {
            let step_index = u32::try_from(step + 1).map_err(|_| ForecastError::InvalidSteps)?;
            let current: Vec<f64> = lags.iter().copied().collect();
            let row = FeatureBuilder::build_prediction_features(
                &current,
                lag_count,
                anchor,
                step_index,
                self.step_interval_minutes,
            )?;

            let predicted = model
                .regressor
                .predict(std::slice::from_ref(&row))?
                .first()
                .copied()
                .ok_or_else(|| ForecastError::model("No prediction returned"))?;

            points.push(ForecastPoint {
                timestamp: project(anchor, step_index, self.step_interval_minutes)?,
                price: predicted,
            });

            lags.pop_back();
            lags.push_front(predicted);
        }

        Ok(Forecast::Available(points))
    }
}
