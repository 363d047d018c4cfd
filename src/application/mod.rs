// Background agents (price collection, retraining)
pub mod agents;

// Feature construction, models and rollout
pub mod ml;

// Training and forecasting orchestration
pub mod forecast_service;

pub use forecast_service::{ForecastService, TrainingPolicy};
