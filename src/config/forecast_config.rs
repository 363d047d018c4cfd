//! Forecasting configuration parsing from environment variables.
//!
//! This module handles loading the lag/training policy and the model parameters.

use super::parse_env;
use crate::application::forecast_service::TrainingPolicy;
use anyhow::Result;
use std::time::Duration;

const MAX_STEP_INTERVAL_MINUTES: u32 = 7 * 24 * 60;

/// Forecasting environment configuration
#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    // Features
    pub lag_count: usize,
    pub step_interval_minutes: u32,

    // Training policy
    pub min_samples: usize,
    pub history_limit: usize,
    pub retrain_every_samples: usize,
    pub retrain_check_interval: Duration,

    // Random forest
    pub n_trees: usize,
    pub seed: u64,

    // Rollout
    pub default_steps: usize,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            lag_count: 5,
            step_interval_minutes: 30,
            min_samples: 6,
            history_limit: 1000,
            retrain_every_samples: 1,
            retrain_check_interval: Duration::from_secs(60),
            n_trees: 100,
            seed: 42,
            default_steps: 6,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let lag_count = parse_env("FORECAST_LAG_COUNT", defaults.lag_count)?;
        if lag_count == 0 {
            anyhow::bail!("FORECAST_LAG_COUNT must be at least 1");
        }

        let step_interval_minutes =
            parse_env("FORECAST_STEP_INTERVAL_MINUTES", defaults.step_interval_minutes)?;
        if !(1..=MAX_STEP_INTERVAL_MINUTES).contains(&step_interval_minutes) {
            anyhow::bail!(
                "FORECAST_STEP_INTERVAL_MINUTES must be between 1 and {} (one week)",
                MAX_STEP_INTERVAL_MINUTES
            );
        }

        let default_steps = parse_env("FORECAST_DEFAULT_STEPS", defaults.default_steps)?;
        if default_steps == 0 {
            anyhow::bail!("FORECAST_DEFAULT_STEPS must be at least 1");
        }

        Ok(Self {
            lag_count,
            step_interval_minutes,
            min_samples: parse_env("FORECAST_MIN_SAMPLES", defaults.min_samples)?,
            history_limit: parse_env("FORECAST_HISTORY_LIMIT", defaults.history_limit)?,
            retrain_every_samples: parse_env(
                "RETRAIN_EVERY_SAMPLES",
                defaults.retrain_every_samples,
            )?,
            retrain_check_interval: Duration::from_secs(parse_env(
                "RETRAIN_CHECK_INTERVAL_SECS",
                defaults.retrain_check_interval.as_secs(),
            )?),
            n_trees: parse_env("FORECAST_N_TREES", defaults.n_trees)?,
            seed: parse_env("FORECAST_SEED", defaults.seed)?,
            default_steps,
        })
    }

    pub fn training_policy(&self) -> TrainingPolicy {
        TrainingPolicy {
            lag_count: self.lag_count,
            min_samples: self.min_samples,
            history_limit: self.history_limit,
            retrain_every_samples: self.retrain_every_samples,
        }
    }
}
