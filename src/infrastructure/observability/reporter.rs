//! Periodic `METRICS_JSON:` lines on stdout describing the price store, the
//! published model and the forecast it currently produces.
//!
//! Nothing here listens on a socket; log shippers pick the lines up.

use crate::application::forecast_service::ForecastService;
use crate::domain::types::{Forecast, ForecastPoint};
use crate::infrastructure::observability::metrics::{CounterSnapshot, Metrics};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub store: StoreSnapshot,
    pub model: ModelSnapshot,
    pub counters: CounterSnapshot,
    /// `None` while the forecast is unavailable
    pub predicted_gas_prices: Option<Vec<ForecastPoint>>,
}

#[derive(Serialize)]
pub struct StoreSnapshot {
    pub sample_count: usize,
    pub latest_gas_price_gwei: Option<f64>,
}

#[derive(Serialize)]
pub struct ModelSnapshot {
    pub trained: bool,
    pub lag_count: Option<usize>,
    pub row_count: Option<usize>,
    pub trained_at: Option<String>,
}

/// Emits a [`MetricsSnapshot`] every `interval`.
///
/// Each snapshot runs a forecast against the published model, so the reporter
/// doubles as the server's forecast log.
pub struct MetricsReporter {
    service: Arc<ForecastService>,
    metrics: Metrics,
    started: Instant,
    interval: Duration,
    forecast_steps: usize,
}

impl MetricsReporter {
    /// `forecast_steps` is the horizon of the forecast embedded in each snapshot.
    pub fn new(
        service: Arc<ForecastService>,
        metrics: Metrics,
        interval_seconds: u64,
        forecast_steps: usize,
    ) -> Self {
        Self {
            service,
            metrics,
            started: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
            forecast_steps,
        }
    }

    pub async fn run(self) {
        info!(
            "MetricsReporter: reporting every {:?} ({}-step forecast)",
            self.interval, self.forecast_steps
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let snapshot = match self.collect_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("MetricsReporter: snapshot failed: {:#}", e);
                    continue;
                }
            };

            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Samples: {} | Model trained: {} | Next: {}",
                        snapshot.store.sample_count,
                        snapshot.model.trained,
                        snapshot
                            .predicted_gas_prices
                            .as_ref()
                            .and_then(|points| points.first())
                            .map(|p| format!("{:.3} gwei", p.price))
                            .unwrap_or_else(|| "unavailable".to_string())
                    );
                }
                Err(e) => warn!("MetricsReporter: could not encode snapshot: {}", e),
            }
            debug!("Prometheus exposition:\n{}", self.metrics.render());
        }
    }

    async fn collect_snapshot(&self) -> anyhow::Result<MetricsSnapshot> {
        let uptime_seconds = self.started.elapsed().as_secs();
        self.metrics.uptime_seconds.set(uptime_seconds as f64);

        let store = self.service.store();
        let sample_count = store.count().await?;
        let latest = store.recent(1).await?.first().map(|s| s.price);

        let model = self.service.forecaster().current_model();
        let forecast = self.service.peek_forecast(self.forecast_steps).await?;

        Ok(MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds,
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: StoreSnapshot {
                sample_count,
                latest_gas_price_gwei: latest,
            },
            model: ModelSnapshot {
                trained: model.is_some(),
                lag_count: model.as_ref().map(|m| m.lag_count()),
                row_count: model.as_ref().map(|m| m.row_count()),
                trained_at: model.as_ref().map(|m| m.trained_at().to_rfc3339()),
            },
            counters: self.metrics.counters(),
            predicted_gas_prices: match forecast {
                Forecast::Available(points) => Some(points),
                Forecast::Unavailable(_) => None,
            },
        })
    }
}
