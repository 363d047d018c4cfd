use crate::application::forecast_service::ForecastService;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{error, info};

/// Periodically retrains the forecaster once enough new samples have arrived.
pub struct RetrainScheduler {
    service: Arc<ForecastService>,
    check_interval: Duration,
}

impl RetrainScheduler {
    pub fn new(service: Arc<ForecastService>, check_interval: Duration) -> Self {
        Self {
            service,
            check_interval,
        }
    }

    pub async fn run(&self) {
        info!(
            "RetrainScheduler started. Interval: {:?}, retrain every {} new samples",
            self.check_interval,
            self.service.policy().retrain_every_samples
        );

        let mut interval = time::interval(self.check_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        // The first tick completes immediately; startup already trained once
        interval.tick().await;

        loop {
            interval.tick().await;

            match self.service.retrain_if_due().await {
                Ok(Some(result)) => info!(
                    "RetrainScheduler: retrained (trained={}, rows={})",
                    result.trained, result.row_count
                ),
                Ok(None) => {}
                Err(e) => error!("RetrainScheduler: retrain failed: {:#}", e),
            }
        }
    }
}
