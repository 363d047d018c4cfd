//! Orchestration of the forecasting pipeline against a price store.
//!
//! Training is always explicit (`train` / `retrain_if_due`); a forecast request
//! only reads the store and rolls out whatever model is currently published.

use crate::application::ml::Forecaster;
use crate::domain::errors::ForecastError;
use crate::domain::repositories::PriceStore;
use crate::domain::types::{Forecast, Sample, TrainResult, UnavailableReason};
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Training policy for the forecast service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingPolicy {
    pub lag_count: usize,
    pub min_samples: usize,
    /// Most recent samples used for a fit
    pub history_limit: usize,
    /// New samples required since the last fit before `retrain_if_due` fits again
    pub retrain_every_samples: usize,
}

impl Default for TrainingPolicy {
    fn default() -> Self {
        Self {
            lag_count: 5,
            min_samples: 6,
            history_limit: 1000,
            retrain_every_samples: 1,
        }
    }
}

pub struct ForecastService {
    store: Arc<dyn PriceStore>,
    forecaster: Arc<Forecaster>,
    policy: TrainingPolicy,
    metrics: Option<Metrics>,
    /// Store size at the last training attempt; the mutex also keeps trainings single-writer
    last_training: Mutex<Option<usize>>,
}

impl ForecastService {
    pub fn new(store: Arc<dyn PriceStore>, forecaster: Arc<Forecaster>, policy: TrainingPolicy) -> Self {
        Self {
            store,
            forecaster,
            policy,
            metrics: None,
            last_training: Mutex::new(None),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<dyn PriceStore> {
        &self.store
    }

    pub fn forecaster(&self) -> &Arc<Forecaster> {
        &self.forecaster
    }

    pub fn policy(&self) -> TrainingPolicy {
        self.policy
    }

    /// Persist a freshly observed gas price.
    pub async fn record(&self, price: f64) -> Result<Sample> {
        let sample = self.store.append(price).await?;
        if let Some(metrics) = &self.metrics {
            metrics.latest_gas_price_gwei.set(sample.price);
        }
        Ok(sample)
    }

    /// Fit a new model on the most recent `history_limit` samples and publish it.
    ///
    /// The fit runs on the blocking pool; forecasts keep using the previous model
    /// until it completes.
    pub async fn train(&self) -> Result<TrainResult> {
        let mut last_training = self.last_training.lock().await;
        self.train_locked(&mut last_training).await
    }

    /// Fit while the caller holds the `last_training` guard.
    async fn train_locked(&self, last_training: &mut Option<usize>) -> Result<TrainResult> {
        let count = self.store.count().await?;
        let history = self
            .store
            .recent_oldest_first(self.policy.history_limit)
            .await?;
        *last_training = Some(count);

        let forecaster = self.forecaster.clone();
        let TrainingPolicy {
            lag_count,
            min_samples,
            ..
        } = self.policy;

        let outcome =
            tokio::task::spawn_blocking(move || forecaster.train(&history, lag_count, min_samples))
                .await
                .context("Training task panicked")?;

        if let Some(metrics) = &self.metrics {
            metrics.record_training(outcome.as_ref().ok());
        }

        let result = outcome?;
        info!(
            "Training finished: trained={} rows={} samples={}",
            result.trained, result.row_count, result.sample_count
        );
        Ok(result)
    }

    /// Train when no attempt was made yet or enough new samples arrived since the last one.
    ///
    /// The decision and the fit share one guard, so concurrent callers never fit twice
    /// for the same batch of samples.
    pub async fn retrain_if_due(&self) -> Result<Option<TrainResult>> {
        let mut last_training = self.last_training.lock().await;

        let count = self.store.count().await?;
        let due = match *last_training {
            None => true,
            Some(last) => count.saturating_sub(last) >= self.policy.retrain_every_samples.max(1),
        };

        if !due {
            debug!("Retrain not due ({} samples stored)", count);
            return Ok(None);
        }

        self.train_locked(&mut last_training).await.map(Some)
    }

    /// Forecast `steps` intervals past the latest stored sample.
    pub async fn predict_next(&self, steps: usize) -> Result<Forecast> {
        if steps == 0 {
            return Err(ForecastError::InvalidSteps.into());
        }

        let forecast = self.peek_forecast(steps).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_forecast(forecast.is_available());
        }
        Ok(forecast)
    }

    /// Same rollout as [`predict_next`](Self::predict_next) without counting it as a
    /// served forecast. Used for periodic status reports.
    pub async fn peek_forecast(&self, steps: usize) -> Result<Forecast> {
        if steps == 0 {
            return Err(ForecastError::InvalidSteps.into());
        }

        // Size the window from the same snapshot that will run the rollout
        let forecast = match self.forecaster.current_model() {
            None => Forecast::Unavailable(UnavailableReason::NoModel),
            Some(model) => {
                let recent = self.store.recent(model.lag_count()).await?;
                self.forecaster.rollout(&model, &recent, steps)?
            }
        };
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::RandomForestLearner;
    use crate::infrastructure::InMemoryPriceStore;
    use chrono::{Duration, TimeZone, Utc};

    fn service(store: Arc<InMemoryPriceStore>, policy: TrainingPolicy) -> ForecastService {
        let forecaster = Arc::new(Forecaster::new(
            Arc::new(RandomForestLearner::new(10, 42)),
            30,
        ));
        ForecastService::new(store, forecaster, policy)
    }

    async fn seed(store: &InMemoryPriceStore, prices: &[f64]) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        for (i, &price) in prices.iter().enumerate() {
            store
                .append_at(start + Duration::minutes(30 * i as i64), price)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_predict_without_training_is_unavailable() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0]).await;
        let service = service(store, TrainingPolicy::default());

        let forecast = service.predict_next(3).await.unwrap();
        assert_eq!(forecast, Forecast::Unavailable(UnavailableReason::NoModel));
    }

    #[tokio::test]
    async fn test_prediction_never_trains_implicitly() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0]).await;
        let service = service(store, TrainingPolicy::default());

        service.predict_next(2).await.unwrap();
        assert!(!service.forecaster().is_trained());
    }

    #[tokio::test]
    async fn test_retrain_if_due_respects_threshold() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0]).await;
        let policy = TrainingPolicy {
            retrain_every_samples: 3,
            ..TrainingPolicy::default()
        };
        let service = service(store.clone(), policy);

        // First call always trains
        assert!(service.retrain_if_due().await.unwrap().is_some());
        assert!(service.retrain_if_due().await.unwrap().is_none());

        service.record(13.0).await.unwrap();
        service.record(12.5).await.unwrap();
        assert!(service.retrain_if_due().await.unwrap().is_none());

        service.record(12.0).await.unwrap();
        let result = service.retrain_if_due().await.unwrap().unwrap();
        assert_eq!(result.sample_count, 10);
        assert!(result.trained);
    }

    #[tokio::test]
    async fn test_training_below_threshold_reports_untrained() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0]).await;
        let service = service(store, TrainingPolicy::default());

        let result = service.train().await.unwrap();
        assert!(!result.trained);
        assert_eq!(result.sample_count, 3);
        assert!(!service.predict_next(1).await.unwrap().is_available());
    }

    #[tokio::test]
    async fn test_history_limit_bounds_training_window() {
        let store = Arc::new(InMemoryPriceStore::new());
        let prices: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64).collect();
        seed(&store, &prices).await;
        let policy = TrainingPolicy {
            history_limit: 12,
            ..TrainingPolicy::default()
        };
        let service = service(store, policy);

        let result = service.train().await.unwrap();
        assert_eq!(result.sample_count, 12);
        assert_eq!(result.row_count, 7);
    }

    #[tokio::test]
    async fn test_zero_steps_is_an_error() {
        let store = Arc::new(InMemoryPriceStore::new());
        let service = service(store, TrainingPolicy::default());
        assert!(service.predict_next(0).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_retrain_checks_fit_once() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0]).await;
        let metrics = Metrics::new().unwrap();
        let service =
            Arc::new(service(store, TrainingPolicy::default()).with_metrics(metrics.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.retrain_if_due().await.unwrap() })
            })
            .collect();

        let mut fits = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                fits += 1;
            }
        }
        assert_eq!(fits, 1);
        assert_eq!(metrics.counters().trainings["trained"], 1);
    }

    #[tokio::test]
    async fn test_peek_forecast_is_not_counted() {
        let store = Arc::new(InMemoryPriceStore::new());
        seed(&store, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 12.0]).await;
        let metrics = Metrics::new().unwrap();
        let service = service(store, TrainingPolicy::default()).with_metrics(metrics.clone());
        service.train().await.unwrap();

        let peeked = service.peek_forecast(2).await.unwrap();
        assert_eq!(metrics.counters().forecasts["available"], 0);

        let served = service.predict_next(2).await.unwrap();
        assert_eq!(peeked, served);
        assert_eq!(metrics.counters().forecasts["available"], 1);
    }
}
