pub mod gas_price_client;
pub mod transfer_cost;

pub use gas_price_client::JsonRpcGasPriceClient;
pub use transfer_cost::{TransferCostEstimate, estimate_transfer_cost};
