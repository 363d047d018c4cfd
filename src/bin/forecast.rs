use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gasoracle::application::ForecastService;
use gasoracle::application::ml::{Forecaster, RandomForestLearner};
use gasoracle::config::Config;
use gasoracle::domain::ports::GasPriceSource;
use gasoracle::domain::repositories::PriceStore;
use gasoracle::domain::types::Forecast;
use gasoracle::infrastructure::rpc::estimate_transfer_cost;
use gasoracle::infrastructure::{Database, JsonRpcGasPriceClient, SqlitePriceStore};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

/// Exit status for "forecast unavailable" (the CLI equivalent of HTTP 503)
const EXIT_UNAVAILABLE: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gas price history and short-horizon forecasts", long_about = None)]
struct Args {
    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on the stored history and print the next predicted gas prices
    Predict {
        /// Number of steps to forecast (default: FORECAST_DEFAULT_STEPS)
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Print the most recent stored gas prices, newest first
    History {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Fetch the current gas price once and store it
    Collect,
    /// Estimate the ETH fee of a PYUSD transfer at the current gas price
    Estimate {
        /// PYUSD amount to transfer
        #[arg(long, default_value_t = 100.0)]
        amount: f64,
        /// Sending address (0x-prefixed)
        #[arg(long)]
        sender: Option<String>,
    },
    /// Backfill history from a CSV file with `timestamp,gas_price` columns (RFC 3339, gwei)
    Import {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    timestamp: DateTime<Utc>,
    gas_price: f64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let database_url = args.database_url.unwrap_or(config.database_url.clone());

    let database = Database::new(&database_url).await?;
    let store = Arc::new(SqlitePriceStore::new(database));

    match args.command {
        Command::Predict { steps } => {
            let learner = Arc::new(RandomForestLearner::new(
                config.forecast.n_trees,
                config.forecast.seed,
            ));
            let forecaster = Arc::new(Forecaster::new(
                learner,
                config.forecast.step_interval_minutes,
            ));
            let service =
                ForecastService::new(store, forecaster, config.forecast.training_policy());

            service.train().await?;
            let steps = steps.unwrap_or(config.forecast.default_steps);

            match service.predict_next(steps).await? {
                Forecast::Available(points) => {
                    let current = service.store().recent(1).await?;
                    let body = serde_json::json!({
                        "current_gas_price_gwei": current.first().map(|s| s.price),
                        "predicted_gas_prices": points,
                        "timestamp": Utc::now().to_rfc3339(),
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Forecast::Unavailable(reason) => {
                    eprintln!("Prediction not available: {}", reason);
                    return Ok(ExitCode::from(EXIT_UNAVAILABLE));
                }
            }
        }
        Command::History { limit } => {
            let history = store.recent(limit).await?;
            let body = serde_json::json!({ "history": history });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Collect => {
            let source =
                JsonRpcGasPriceClient::new(config.collector.rpc_url.clone(), config.collector.timeout);
            let price = tokio::time::timeout(config.collector.timeout, source.fetch_gas_price())
                .await
                .context("Timed out fetching gas price")??;
            let sample = store.append(price).await?;
            let body = serde_json::json!({
                "gas_price_gwei": sample.price,
                "network": "Ethereum",
                "timestamp": sample.timestamp,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Estimate { amount, sender } => {
            let client =
                JsonRpcGasPriceClient::new(config.collector.rpc_url.clone(), config.collector.timeout);
            // Two calls: eth_estimateGas then eth_gasPrice
            let estimate = tokio::time::timeout(
                config.collector.timeout * 2,
                estimate_transfer_cost(&client, amount, sender.as_deref()),
            )
            .await
            .context("Timed out estimating transfer cost")??;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Command::Import { input } => {
            let file = File::open(&input)
                .with_context(|| format!("Failed to open history file {:?}", input))?;
            let mut rdr = csv::Reader::from_reader(BufReader::new(file));

            let mut imported = 0usize;
            for result in rdr.deserialize() {
                let record: HistoryRecord = result?;
                store
                    .append_at(record.timestamp, record.gas_price)
                    .await
                    .with_context(|| format!("Failed to import row {}", imported + 1))?;
                imported += 1;
            }

            info!("Imported {} samples from {:?}", imported, input);
            println!("Imported {} samples.", imported);
        }
    }

    Ok(ExitCode::SUCCESS)
}
