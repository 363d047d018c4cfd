//! Prometheus metrics definitions for gasoracle
//!
//! All metrics use the `gasoracle_` prefix and are read-only.

use crate::domain::types::TrainResult;
use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const FETCH_OUTCOMES: &[&str] = &["ok", "error", "timeout"];
const TRAINING_OUTCOMES: &[&str] = &["trained", "skipped", "failed"];
const FORECAST_OUTCOMES: &[&str] = &["available", "unavailable"];

/// Counter values as they appear in the `METRICS_JSON:` line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub fetches: BTreeMap<String, u64>,
    pub fetch_latency_count: u64,
    pub fetch_latency_sum_seconds: f64,
    pub trainings: BTreeMap<String, u64>,
    pub forecasts: BTreeMap<String, u64>,
}

/// Prometheus metrics for the forecasting daemon
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Last collected gas price in gwei
    pub latest_gas_price_gwei: GenericGauge<AtomicF64>,
    /// Upstream fetches by outcome (ok, error, timeout)
    pub fetches_total: CounterVec,
    /// Upstream fetch latency in seconds
    pub fetch_latency_seconds: Histogram,
    /// Training attempts by outcome (trained, skipped, failed)
    pub trainings_total: CounterVec,
    /// Whether a model is published (0/1)
    pub model_trained: GenericGauge<AtomicF64>,
    /// Feature rows used by the last successful fit
    pub training_rows: GenericGauge<AtomicF64>,
    /// Forecast requests by outcome (available, unavailable)
    pub forecasts_total: CounterVec,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let latest_gas_price_gwei = Gauge::with_opts(Opts::new(
            "gasoracle_latest_gas_price_gwei",
            "Last collected gas price in gwei",
        ))?;
        registry.register(Box::new(latest_gas_price_gwei.clone()))?;

        let fetches_total = CounterVec::new(
            Opts::new("gasoracle_fetches_total", "Upstream gas price fetches by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(fetches_total.clone()))?;

        let fetch_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gasoracle_fetch_latency_seconds",
                "Upstream gas price fetch latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        let trainings_total = CounterVec::new(
            Opts::new("gasoracle_trainings_total", "Training attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(trainings_total.clone()))?;

        let model_trained = Gauge::with_opts(Opts::new(
            "gasoracle_model_trained",
            "Whether a trained model is published (0/1)",
        ))?;
        registry.register(Box::new(model_trained.clone()))?;

        let training_rows = Gauge::with_opts(Opts::new(
            "gasoracle_training_rows",
            "Feature rows used by the last successful fit",
        ))?;
        registry.register(Box::new(training_rows.clone()))?;

        let forecasts_total = CounterVec::new(
            Opts::new("gasoracle_forecasts_total", "Forecast requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(forecasts_total.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "gasoracle_uptime_seconds",
            "Daemon uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            latest_gas_price_gwei,
            fetches_total,
            fetch_latency_seconds,
            trainings_total,
            model_trained,
            training_rows,
            forecasts_total,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_fetches(&self, outcome: &str) {
        self.fetches_total.with_label_values(&[outcome]).inc();
    }

    pub fn observe_fetch_latency(&self, latency: f64) {
        self.fetch_latency_seconds.observe(latency);
    }

    /// Record a training attempt; `None` means the fit failed.
    pub fn record_training(&self, result: Option<&TrainResult>) {
        match result {
            Some(r) if r.trained => {
                self.trainings_total.with_label_values(&["trained"]).inc();
                self.model_trained.set(1.0);
                self.training_rows.set(r.row_count as f64);
            }
            Some(_) => {
                self.trainings_total.with_label_values(&["skipped"]).inc();
                self.model_trained.set(0.0);
            }
            None => {
                self.trainings_total.with_label_values(&["failed"]).inc();
            }
        }
    }

    pub fn record_forecast(&self, available: bool) {
        let outcome = if available { "available" } else { "unavailable" };
        self.forecasts_total.with_label_values(&[outcome]).inc();
    }

    /// Current counter values, every known outcome included even at zero.
    pub fn counters(&self) -> CounterSnapshot {
        CounterSnapshot {
            fetches: by_outcome(&self.fetches_total, FETCH_OUTCOMES),
            fetch_latency_count: self.fetch_latency_seconds.get_sample_count(),
            fetch_latency_sum_seconds: self.fetch_latency_seconds.get_sample_sum(),
            trainings: by_outcome(&self.trainings_total, TRAINING_OUTCOMES),
            forecasts: by_outcome(&self.forecasts_total, FORECAST_OUTCOMES),
        }
    }
}

fn by_outcome(counter: &CounterVec, outcomes: &[&str]) -> BTreeMap<String, u64> {
    outcomes
        .iter()
        .map(|outcome| {
            let value = counter.with_label_values(&[*outcome]).get();
            (outcome.to_string(), value as u64)
        })
        .collect()
}
