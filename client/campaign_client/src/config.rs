//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{CampaignError, Result};
use crate::types::Address;

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint used for contract reads and receipt polling
    pub rpc_url: String,
    /// JSON-RPC endpoint that holds the signing accounts (defaults to `rpc_url`)
    pub wallet_url: String,
    /// The campaign contract address (0x-prefixed, 20 bytes)
    pub contract_address: Address,
    /// How often to poll for a transaction receipt while awaiting finality
    pub receipt_poll_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let rpc_url = env_var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());
        let contract_address = env_var("CONTRACT_ADDRESS").map_err(|_| {
            CampaignError::Config("CONTRACT_ADDRESS environment variable is required".to_string())
        })?;

        Ok(Config {
            wallet_url: env_var("WALLET_RPC_URL").unwrap_or_else(|_| rpc_url.clone()),
            rpc_url,
            contract_address: parse_contract_address(&contract_address)?,
            receipt_poll_interval: Duration::from_millis(
                env_var("RECEIPT_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .map_err(|_| {
                        CampaignError::Config("Invalid RECEIPT_POLL_INTERVAL_MS".to_string())
                    })?,
            ),
            request_timeout: Duration::from_secs(
                env_var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| CampaignError::Config("Invalid REQUEST_TIMEOUT_SECS".to_string()))?,
            ),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| CampaignError::Config(format!("Missing env var: {key}")))
}

fn parse_contract_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CampaignError::Config(format!("CONTRACT_ADDRESS must be 0x-prefixed: {raw}")))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CampaignError::Config(format!(
            "CONTRACT_ADDRESS must be 20 hex-encoded bytes: {raw}"
        )));
    }
    Ok(Address::new(trimmed))
}
