pub mod core;
pub mod observability;
pub mod persistence;
pub mod repositories;
pub mod rpc;

pub use persistence::{Database, SqlitePriceStore};
pub use repositories::InMemoryPriceStore;
pub use rpc::JsonRpcGasPriceClient;
