use crate::application::forecast_service::ForecastService;
use crate::domain::ports::GasPriceSource;
use crate::domain::types::Sample;
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};
use tracing::{error, info, warn};

/// Periodically fetches the network gas price and appends it to the store.
///
/// A failed or slow fetch costs one sample, never the loop.
pub struct PriceCollector {
    source: Arc<dyn GasPriceSource>,
    service: Arc<ForecastService>,
    collect_interval: Duration,
    fetch_timeout: Duration,
    metrics: Option<Metrics>,
}

impl PriceCollector {
    pub fn new(
        source: Arc<dyn GasPriceSource>,
        service: Arc<ForecastService>,
        collect_interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            service,
            collect_interval,
            fetch_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn run(&self) {
        info!(
            "PriceCollector started. Source: {}, Interval: {:?}",
            self.source.name(),
            self.collect_interval
        );

        let mut interval = time::interval(self.collect_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.collect_once().await;
        }
    }

    /// One collection cycle. Returns the stored sample, or `None` when this cycle produced none.
    pub async fn collect_once(&self) -> Option<Sample> {
        let started = Instant::now();
        let fetched = time::timeout(self.fetch_timeout, self.source.fetch_gas_price()).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_fetch_latency(started.elapsed().as_secs_f64());
        }

        let price = match fetched {
            Ok(Ok(price)) => price,
            Ok(Err(e)) => {
                warn!("PriceCollector: fetch from {} failed: {:#}", self.source.name(), e);
                self.count_fetch("error");
                return None;
            }
            Err(_) => {
                warn!(
                    "PriceCollector: fetch from {} timed out after {:?}",
                    self.source.name(),
                    self.fetch_timeout
                );
                self.count_fetch("timeout");
                return None;
            }
        };

        match self.service.record(price).await {
            Ok(sample) => {
                self.count_fetch("ok");
                info!("PriceCollector: stored gas price {} gwei (#{})", price, sample.id);
                Some(sample)
            }
            Err(e) => {
                error!("PriceCollector: failed to store gas price {}: {:#}", price, e);
                self.count_fetch("error");
                None
            }
        }
    }

    fn count_fetch(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_fetches(outcome);
        }
    }
}
