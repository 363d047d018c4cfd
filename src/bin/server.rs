//! gasoracle Server - Headless gas price collector and forecaster
//!
//! Collects the network gas price on an interval, retrains the forecaster when
//! new samples arrive, and pushes metrics and forecasts via structured JSON logs
//! to stdout. It never listens on a socket.
//!
//! # Usage
//! ```sh
//! GCP_RPC_URL=https://... cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `DATABASE_URL` - SQLite database (default: sqlite://data/gas_data.db)
//! - `GCP_RPC_URL` - Ethereum JSON-RPC endpoint
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use gasoracle::application::agents::{PriceCollector, RetrainScheduler};
use gasoracle::application::ml::{Forecaster, RandomForestLearner};
use gasoracle::application::ForecastService;
use gasoracle::config::Config;
use gasoracle::infrastructure::observability::{Metrics, MetricsReporter};
use gasoracle::infrastructure::{Database, JsonRpcGasPriceClient, SqlitePriceStore};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("gasoracle Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: DB={}, Lags={}, MinSamples={}, Step={}min",
        config.database_url,
        config.forecast.lag_count,
        config.forecast.min_samples,
        config.forecast.step_interval_minutes
    );

    let metrics = Metrics::new()?;

    let database = Database::new(&config.database_url).await?;
    let store = Arc::new(SqlitePriceStore::new(database));

    let learner = Arc::new(RandomForestLearner::new(
        config.forecast.n_trees,
        config.forecast.seed,
    ));
    let forecaster = Arc::new(Forecaster::new(
        learner,
        config.forecast.step_interval_minutes,
    ));
    let service = Arc::new(
        ForecastService::new(store, forecaster, config.forecast.training_policy())
            .with_metrics(metrics.clone()),
    );

    // Initial fit on whatever history is already stored
    match service.train().await {
        Ok(result) if result.trained => info!(
            "Initial model trained with {} rows ({} samples)",
            result.row_count, result.sample_count
        ),
        Ok(result) => info!(
            "Not enough history for a model yet ({} samples). Forecasts unavailable.",
            result.sample_count
        ),
        Err(e) => warn!("Initial training failed: {:#}", e),
    }

    if config.collector.enabled {
        let source = Arc::new(JsonRpcGasPriceClient::new(
            config.collector.rpc_url.clone(),
            config.collector.timeout,
        ));
        let collector = PriceCollector::new(
            source,
            service.clone(),
            config.collector.interval,
            config.collector.timeout,
        )
        .with_metrics(metrics.clone());

        tokio::spawn(async move {
            collector.run().await;
        });
    } else {
        info!("Price collection disabled.");
    }

    let scheduler = RetrainScheduler::new(service.clone(), config.forecast.retrain_check_interval);
    tokio::spawn(async move {
        scheduler.run().await;
    });

    if config.observability.enabled {
        let reporter = MetricsReporter::new(
            service.clone(),
            metrics,
            config.observability.interval_seconds,
            config.forecast.default_steps,
        );

        tokio::spawn(async move {
            reporter.run().await;
        });

        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    info!("Server running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");

    Ok(())
}
