// Core forecasting types
pub mod types;

// Feature layout shared by training and inference
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
