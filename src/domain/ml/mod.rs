pub mod feature_registry;

pub use feature_registry::FeatureRow;
