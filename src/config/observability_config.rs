//! Reporter settings. Unlike the forecast settings these never fail to load:
//! a malformed value falls back to its default.

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between `METRICS_JSON:` lines, at least 1
    pub interval_seconds: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: lenient("OBSERVABILITY_ENABLED", defaults.enabled),
            interval_seconds: lenient("OBSERVABILITY_INTERVAL", defaults.interval_seconds).max(1),
        }
    }
}

fn lenient<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
