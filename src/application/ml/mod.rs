pub mod feature_builder;
pub mod forecaster;
pub mod predictor;
pub mod smartcore_predictor;

pub use feature_builder::FeatureBuilder;
pub use forecaster::{Forecaster, TrainedModel};
pub use predictor::{Learner, Regressor};
pub use smartcore_predictor::RandomForestLearner;
