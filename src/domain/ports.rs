use anyhow::Result;
use async_trait::async_trait;

/// Upstream provider of the current network gas price.
#[async_trait]
pub trait GasPriceSource: Send + Sync {
    /// Current gas price in gwei.
    async fn fetch_gas_price(&self) -> Result<f64>;

    fn name(&self) -> &str;
}
