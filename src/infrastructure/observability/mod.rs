//! Metrics for the collector, trainer and forecaster.
//!
//! `Metrics` keeps the counters in a private prometheus registry. `MetricsReporter`
//! writes them out with the current forecast as JSON log lines, so the daemon
//! needs no inbound port.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
