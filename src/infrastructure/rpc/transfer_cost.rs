//! Fee estimate for a PYUSD `transfer` on Ethereum mainnet.
//!
//! The node is asked for `eth_estimateGas` on the transfer call. When it refuses
//! (unfunded sender, rate limit, ...) a fixed ERC-20 transfer budget is used.

use super::gas_price_client::JsonRpcGasPriceClient;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// PYUSD ERC-20 contract on mainnet
pub const PYUSD_ADDRESS: &str = "0x6c3ea9036406852006290770BEdFcAbA0e23A0e8";
const PYUSD_DECIMALS: i32 = 6;

/// Sender used when the caller does not supply one
pub const DEFAULT_SENDER: &str = "0x264bd8291fAE1D75DB2c5F573b07faA6715997B5";

/// Gas budget assumed when the node cannot estimate the transfer
pub const FALLBACK_TRANSFER_GAS: u64 = 50_000;

/// `transfer(address,uint256)` selector
const TRANSFER_SELECTOR: &str = "a9059cbb";

const WEI_PER_ETH: f64 = 1e18;
const WEI_PER_GWEI: f64 = 1e9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferCostEstimate {
    pub pyusd_amount: f64,
    pub gas_units: u64,
    /// True when `gas_units` is the fallback budget rather than a node estimate
    pub used_fallback_gas: bool,
    pub gas_price_gwei: f64,
    pub estimated_cost_eth: f64,
}

/// PYUSD amount in token base units (6 decimals), truncated like the contract would.
pub fn token_units(amount: f64) -> Result<u128> {
    if !amount.is_finite() || amount < 0.0 {
        anyhow::bail!("Invalid PYUSD amount {}: must be finite and non-negative", amount);
    }
    let units = (amount * 10f64.powi(PYUSD_DECIMALS)).trunc();
    if units > u128::MAX as f64 {
        anyhow::bail!("PYUSD amount {} is too large", amount);
    }
    Ok(units as u128)
}

fn address_digits(address: &str) -> Result<&str> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .with_context(|| format!("Address is not 0x-prefixed: {}", address))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid address: {}", address);
    }
    Ok(digits)
}

/// ABI calldata for `transfer(recipient, amount)`: selector, then both
/// arguments left-padded to 32 bytes.
pub fn encode_transfer(recipient: &str, amount: u128) -> Result<String> {
    let recipient = address_digits(recipient)?.to_ascii_lowercase();
    Ok(format!("0x{}{:0>64}{:064x}", TRANSFER_SELECTOR, recipient, amount))
}

/// Combines a gas estimate (or its failure) with the gas price.
pub fn transfer_cost(
    pyusd_amount: f64,
    gas_estimate: Result<u64>,
    gas_price_wei: u128,
) -> TransferCostEstimate {
    let (gas_units, used_fallback_gas) = match gas_estimate {
        Ok(gas) => (gas, false),
        Err(e) => {
            warn!(
                "Gas estimation failed: {:#}. Using fallback: {}",
                e, FALLBACK_TRANSFER_GAS
            );
            (FALLBACK_TRANSFER_GAS, true)
        }
    };

    let cost_wei = u128::from(gas_units).saturating_mul(gas_price_wei);
    TransferCostEstimate {
        pyusd_amount,
        gas_units,
        used_fallback_gas,
        gas_price_gwei: gas_price_wei as f64 / WEI_PER_GWEI,
        estimated_cost_eth: cost_wei as f64 / WEI_PER_ETH,
    }
}

/// Estimates the ETH fee of sending `pyusd_amount` PYUSD from `sender` (to itself).
pub async fn estimate_transfer_cost(
    client: &JsonRpcGasPriceClient,
    pyusd_amount: f64,
    sender: Option<&str>,
) -> Result<TransferCostEstimate> {
    let sender = sender.unwrap_or(DEFAULT_SENDER);
    let data = encode_transfer(sender, token_units(pyusd_amount)?)?;

    let tx = json!({
        "from": sender,
        "to": PYUSD_ADDRESS,
        "data": data,
    });
    let gas_estimate = client.estimate_gas(tx).await;
    let gas_price_wei = client
        .gas_price_wei()
        .await
        .context("Failed to read gas price for the estimate")?;

    Ok(transfer_cost(pyusd_amount, gas_estimate, gas_price_wei))
}
