pub mod collector;
pub mod retrain_scheduler;

pub use collector::PriceCollector;
pub use retrain_scheduler::RetrainScheduler;
