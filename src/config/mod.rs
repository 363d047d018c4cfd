//! Configuration module for gasoracle.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Forecasting, Collection, and Observability.

mod collector_config;
mod forecast_config;
mod observability_config;

pub use collector_config::CollectorEnvConfig;
pub use forecast_config::ForecastEnvConfig;
pub use observability_config::ObservabilityEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub forecast: ForecastEnvConfig,
    pub collector: CollectorEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/gas_data.db".to_string());

        let forecast = ForecastEnvConfig::from_env().context("Failed to load forecast config")?;
        let collector = CollectorEnvConfig::from_env().context("Failed to load collector config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            database_url,
            forecast,
            collector,
            observability,
        })
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
/// A value that is set but unparsable is an error.
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}
