//! Price collection configuration parsing from environment variables.

use super::parse_env;
use anyhow::Result;
use std::env;
use std::time::Duration;

/// Collector environment configuration
#[derive(Debug, Clone)]
pub struct CollectorEnvConfig {
    pub enabled: bool,
    pub rpc_url: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl CollectorEnvConfig {
    pub fn from_env() -> Result<Self> {
        let timeout_secs: u64 = parse_env("COLLECTOR_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            anyhow::bail!("COLLECTOR_TIMEOUT_SECS must be at least 1");
        }

        Ok(Self {
            enabled: parse_env("COLLECTOR_ENABLED", true)?,
            rpc_url: env::var("GCP_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            interval: Duration::from_secs(parse_env("COLLECTOR_INTERVAL_SECS", 1800)?),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
