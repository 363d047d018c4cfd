use crate::config::Config;
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const KEYS: &[&str] = &[
    "DATABASE_URL",
    "GCP_RPC_URL",
    "FORECAST_LAG_COUNT",
    "FORECAST_MIN_SAMPLES",
    "FORECAST_HISTORY_LIMIT",
    "FORECAST_STEP_INTERVAL_MINUTES",
    "FORECAST_DEFAULT_STEPS",
    "FORECAST_N_TREES",
    "FORECAST_SEED",
    "RETRAIN_EVERY_SAMPLES",
    "RETRAIN_CHECK_INTERVAL_SECS",
    "COLLECTOR_ENABLED",
    "COLLECTOR_INTERVAL_SECS",
    "COLLECTOR_TIMEOUT_SECS",
    "OBSERVABILITY_ENABLED",
    "OBSERVABILITY_INTERVAL",
];

fn clear_env() {
    for key in KEYS {
        // SAFETY: tests touching the environment hold ENV_LOCK
        unsafe { env::remove_var(key) };
    }
}

fn set(key: &str, value: &str) {
    // SAFETY: tests touching the environment hold ENV_LOCK
    unsafe { env::set_var(key, value) };
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().expect("Should parse with defaults");

    assert_eq!(config.database_url, "sqlite://data/gas_data.db");
    assert_eq!(config.forecast.lag_count, 5);
    assert_eq!(config.forecast.min_samples, 6);
    assert_eq!(config.forecast.history_limit, 1000);
    assert_eq!(config.forecast.step_interval_minutes, 30);
    assert_eq!(config.forecast.default_steps, 6);
    assert_eq!(config.forecast.n_trees, 100);
    assert_eq!(config.forecast.seed, 42);
    assert_eq!(config.collector.interval, Duration::from_secs(1800));
    assert_eq!(config.collector.timeout, Duration::from_secs(10));
    assert!(config.collector.enabled);
    assert!(config.observability.enabled);
    assert_eq!(config.observability.interval_seconds, 60);
}

#[test]
fn test_config_overrides() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    set("FORECAST_LAG_COUNT", "3");
    set("FORECAST_MIN_SAMPLES", "20");
    set("RETRAIN_EVERY_SAMPLES", "4");
    set("GCP_RPC_URL", "https://rpc.example.org");
    set("COLLECTOR_ENABLED", "false");

    let config = Config::from_env().unwrap();
    let policy = config.forecast.training_policy();

    assert_eq!(policy.lag_count, 3);
    assert_eq!(policy.min_samples, 20);
    assert_eq!(policy.retrain_every_samples, 4);
    assert_eq!(config.collector.rpc_url, "https://rpc.example.org");
    assert!(!config.collector.enabled);

    clear_env();
}

#[test]
fn test_invalid_numbers_are_errors() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    set("FORECAST_LAG_COUNT", "five");
    assert!(Config::from_env().is_err());

    set("FORECAST_LAG_COUNT", "0");
    assert!(Config::from_env().is_err());

    clear_env();
    set("FORECAST_STEP_INTERVAL_MINUTES", "4294967295");
    assert!(Config::from_env().is_err());

    set("FORECAST_STEP_INTERVAL_MINUTES", "10080");
    assert_eq!(Config::from_env().unwrap().forecast.step_interval_minutes, 10080);

    clear_env();
    set("COLLECTOR_TIMEOUT_SECS", "0");
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
fn test_observability_falls_back_on_garbage() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    set("OBSERVABILITY_ENABLED", "maybe");
    set("OBSERVABILITY_INTERVAL", "soon");

    let config = Config::from_env().unwrap();
    assert!(config.observability.enabled);
    assert_eq!(config.observability.interval_seconds, 60);

    clear_env();
}
