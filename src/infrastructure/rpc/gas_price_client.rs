use crate::domain::ports::GasPriceSource;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const WEI_PER_GWEI: f64 = 1_000_000_000.0;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Minimal Ethereum JSON-RPC client: gas price and gas estimation.
pub struct JsonRpcGasPriceClient {
    client: ClientWithMiddleware,
    rpc_url: String,
}

impl JsonRpcGasPriceClient {
    pub fn new(rpc_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_client(request_timeout),
            rpc_url: rpc_url.into(),
        }
    }

    /// Performs one JSON-RPC call and returns the hex quantity in `result`.
    async fn call(&self, method: &str, params: Value) -> anyhow::Result<String> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        if !response.status().is_success() {
            anyhow::bail!("RPC endpoint returned status: {}", response.status());
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(err) = body.error {
            anyhow::bail!("{} failed ({}): {}", method, err.code, err.message);
        }

        body.result
            .with_context(|| format!("{} response has no result", method))
    }

    pub async fn gas_price_wei(&self) -> anyhow::Result<u128> {
        let quantity = self.call("eth_gasPrice", Value::Array(Vec::new())).await?;
        parse_hex_quantity(&quantity)
    }

    /// Gas units the node expects `tx` (`from`, `to`, `data`) to consume.
    pub async fn estimate_gas(&self, tx: Value) -> anyhow::Result<u64> {
        let quantity = self.call("eth_estimateGas", Value::Array(vec![tx])).await?;
        let gas = parse_hex_quantity(&quantity)?;
        u64::try_from(gas).with_context(|| format!("Gas estimate out of range: {}", quantity))
    }
}

/// Parses a JSON-RPC hex quantity such as `"0x3b9aca00"`.
pub fn parse_hex_quantity(quantity: &str) -> anyhow::Result<u128> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .with_context(|| format!("Quantity is not 0x-prefixed: {}", quantity))?;
    if digits.is_empty() {
        anyhow::bail!("Empty hex quantity");
    }
    u128::from_str_radix(digits, 16).with_context(|| format!("Invalid hex quantity: {}", quantity))
}

/// Converts a JSON-RPC hex quantity in wei (e.g. `"0x3b9aca00"`) to gwei.
pub fn hex_wei_to_gwei(quantity: &str) -> anyhow::Result<f64> {
    Ok(parse_hex_quantity(quantity)? as f64 / WEI_PER_GWEI)
}

#[async_trait]
impl GasPriceSource for JsonRpcGasPriceClient {
    async fn fetch_gas_price(&self) -> anyhow::Result<f64> {
        let wei = self.gas_price_wei().await?;
        let gwei = wei as f64 / WEI_PER_GWEI;
        debug!("eth_gasPrice: {} wei -> {} gwei", wei, gwei);
        Ok(gwei)
    }

    fn name(&self) -> &str {
        "Ethereum JSON-RPC"
    }
}
