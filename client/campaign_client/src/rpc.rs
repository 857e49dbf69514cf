//! Ethereum JSON-RPC implementations of the collaborator traits.
//!
//! ## Classification
//!
//! * JSON-RPC error code `4001` (EIP-1193 "user rejected") becomes
//!   [`ProxyError::UserRejected`].
//! * Any other JSON-RPC error becomes [`ProxyError::Execution`]. When the
//!   error carries an `Error(string)` revert payload the decoded reason is
//!   used, otherwise the node's message is kept as-is.
//! * HTTP failures are [`ProxyError::Transport`].
//!
//! ## Finality
//!
//! A transaction is final once `eth_getTransactionReceipt` returns a
//! receipt with a non-zero status. Polling has no deadline; any error from
//! the receipt call, transport or node-side, is logged and polling continues.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::abi;
use crate::amount::MonetaryAmount;
use crate::config::Config;
use crate::errors::ProxyError;
use crate::proxy::{
    CampaignContract, PendingTransaction, ProxyResult, TransactionReceipt, Wallet,
};
use crate::types::{Address, Identity};

const USER_REJECTED_CODE: i64 = 4001;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawReceipt {
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    /// `0x1` success, `0x0` reverted.
    pub status: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────

struct RpcTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcTransport {
    fn new(client: Client, url: &str) -> Self {
        RpcTransport {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue one request. `Ok(None)` means the node answered `null`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProxyResult<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = body.error {
            debug!("{method} returned error {}: {}", err.code, err.message);
            return Err(classify(err));
        }
        Ok(body.result)
    }

    async fn call_required<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProxyResult<T> {
        self.call(method, params)
            .await?
            .ok_or_else(|| ProxyError::Decode(format!("empty result from {method}")))
    }
}

fn classify(err: RpcError) -> ProxyError {
    if err.code == USER_REJECTED_CODE {
        return ProxyError::UserRejected;
    }
    let reason = err
        .data
        .as_ref()
        .and_then(revert_payload)
        .and_then(|payload| abi::decode_hex(payload).ok())
        .and_then(|bytes| abi::decode_revert_reason(&bytes))
        .unwrap_or(err.message);
    ProxyError::Execution { reason }
}

/// Nodes put revert data either directly in `data` or in `data.data`.
fn revert_payload(data: &Value) -> Option<&str> {
    data.as_str()
        .or_else(|| data.get("data").and_then(|v| v.as_str()))
}

fn parse_quantity(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.strip_prefix("0x").unwrap_or(raw), 16).ok()
}

// ─────────────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────────────

/// Campaign contract reached over JSON-RPC. Reads go to the node at
/// `rpc_url`; transactions are signed by the accounts at `wallet_url`.
pub struct JsonRpcContract {
    node: RpcTransport,
    signer: RpcTransport,
    address: Address,
    poll_interval: Duration,
}

impl JsonRpcContract {
    pub fn new(client: Client, config: &Config) -> Self {
        JsonRpcContract {
            node: RpcTransport::new(client.clone(), &config.rpc_url),
            signer: RpcTransport::new(client, &config.wallet_url),
            address: config.contract_address.clone(),
            poll_interval: config.receipt_poll_interval,
        }
    }

    async fn view(&self, signature: &str, args: &[u64]) -> ProxyResult<Vec<u8>> {
        let data = abi::encode_call(signature, args);
        let raw: String = self
            .node
            .call_required(
                "eth_call",
                json!([{ "to": self.address.as_str(), "data": data }, "latest"]),
            )
            .await?;
        abi::decode_hex(&raw)
    }

    async fn transact(
        &self,
        sender: &Identity,
        signature: &str,
        value: Option<MonetaryAmount>,
    ) -> ProxyResult<PendingTransaction> {
        let mut tx = json!({
            "from": sender.as_str(),
            "to": self.address.as_str(),
            "data": abi::encode_call(signature, &[]),
        });
        if let Some(value) = value {
            tx["value"] = json!(format!("0x{:x}", value.base_units()));
        }

        let tx_hash: String = self
            .signer
            .call_required("eth_sendTransaction", json!([tx]))
            .await?;
        debug!("{signature} sent as {tx_hash}");
        Ok(PendingTransaction { tx_hash })
    }
}

#[async_trait]
impl CampaignContract for JsonRpcContract {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn name(&self) -> ProxyResult<String> {
        abi::decode_string(&self.view("projectName()", &[]).await?)
    }

    async fn description(&self) -> ProxyResult<String> {
        abi::decode_string(&self.view("description()", &[]).await?)
    }

    async fn goal(&self) -> ProxyResult<String> {
        abi::decode_uint(&self.view("goal()", &[]).await?, 0)
    }

    async fn total_raised(&self) -> ProxyResult<String> {
        abi::decode_uint(&self.view("totalFunds()", &[]).await?, 0)
    }

    async fn owner(&self) -> ProxyResult<String> {
        abi::decode_address(&self.view("owner()", &[]).await?, 0)
    }

    async fn participant_count(&self) -> ProxyResult<String> {
        abi::decode_uint(&self.view("donorCount()", &[]).await?, 0)
    }

    async fn participant_at(&self, index: u64) -> ProxyResult<(String, String)> {
        let data = self.view("donors(uint256)", &[index]).await?;
        Ok((abi::decode_address(&data, 0)?, abi::decode_uint(&data, 1)?))
    }

    async fn fund(
        &self,
        sender: &Identity,
        amount: MonetaryAmount,
    ) -> ProxyResult<PendingTransaction> {
        self.transact(sender, "fund()", Some(amount)).await
    }

    async fn withdraw(&self, sender: &Identity) -> ProxyResult<PendingTransaction> {
        self.transact(sender, "withdraw()", None).await
    }

    async fn refund(&self, sender: &Identity) -> ProxyResult<PendingTransaction> {
        self.transact(sender, "refund()", None).await
    }

    async fn wait_for_finality(
        &self,
        pending: &PendingTransaction,
    ) -> ProxyResult<TransactionReceipt> {
        poll_receipt(&pending.tx_hash, self.poll_interval, || {
            self.node
                .call::<RawReceipt>("eth_getTransactionReceipt", json!([pending.tx_hash]))
        })
        .await
    }
}

/// Poll until a receipt shows up. Every failure of the receipt call itself is
/// retried; only a reverted receipt ends the wait with an error.
async fn poll_receipt<F, Fut>(
    tx_hash: &str,
    interval: Duration,
    mut fetch: F,
) -> ProxyResult<TransactionReceipt>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProxyResult<Option<RawReceipt>>>,
{
    loop {
        match fetch().await {
            Ok(Some(receipt)) => return settle(receipt),
            Ok(None) => debug!("{tx_hash} not yet mined"),
            Err(e) => {
                warn!("Receipt poll for {tx_hash} failed (will retry in {interval:?}): {e}");
            }
        }
        tokio::time::sleep(interval).await;
    }
}

fn settle(receipt: RawReceipt) -> ProxyResult<TransactionReceipt> {
    if receipt.status.as_deref().and_then(parse_quantity) == Some(0) {
        return Err(ProxyError::Execution {
            reason: format!("transaction {} reverted", receipt.tx_hash),
        });
    }
    Ok(TransactionReceipt {
        block_number: receipt.block_number.as_deref().and_then(parse_quantity),
        tx_hash: receipt.tx_hash,
        finalized_at: Utc::now(),
    })
}

// ─────────────────────────────────────────────────────────
// Wallet
// ─────────────────────────────────────────────────────────

/// Wallet backed by a JSON-RPC endpoint that manages accounts
/// (`eth_requestAccounts` / `eth_accounts`).
pub struct NodeWallet {
    rpc: RpcTransport,
}

impl NodeWallet {
    pub fn new(client: Client, config: &Config) -> Self {
        NodeWallet {
            rpc: RpcTransport::new(client, &config.wallet_url),
        }
    }
}

#[async_trait]
impl Wallet for NodeWallet {
    fn is_available(&self) -> bool {
        !self.rpc.url.is_empty()
    }

    async fn request_access(&self) -> ProxyResult<Identity> {
        let accounts: Vec<String> = self
            .rpc
            .call_required("eth_requestAccounts", json!([]))
            .await?;
        accounts
            .into_iter()
            .next()
            .map(Address::new)
            .ok_or_else(|| ProxyError::Execution {
                reason: "wallet returned no accounts".to_string(),
            })
    }

    async fn current_identity(&self) -> ProxyResult<Option<Identity>> {
        let accounts: Option<Vec<String>> = self.rpc.call("eth_accounts", json!([])).await?;
        Ok(accounts.and_then(|a| a.into_iter().next()).map(Address::new))
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
