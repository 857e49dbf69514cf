//! Collaborator interfaces: the remote campaign contract and the wallet.
//!
//! Both are consumed only through these traits. [`crate::rpc`] provides
//! JSON-RPC implementations; tests use in-memory mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::amount::MonetaryAmount;
use crate::errors::ProxyError;
use crate::types::{Address, Identity};

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

/// A state-changing call accepted by the ledger but not yet final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub tx_hash: String,
}

/// Proof that a submitted call reached finality successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub finalized_at: DateTime<Utc>,
}

/// Typed call surface of the deployed campaign contract.
///
/// Numeric reads return the ledger's native integer rendering (base-10
/// digits); the client parses them itself so malformed values surface as
/// read failures.
#[async_trait]
pub trait CampaignContract: Send + Sync {
    /// Address of the deployed contract.
    fn address(&self) -> &Address;

    async fn name(&self) -> ProxyResult<String>;
    async fn description(&self) -> ProxyResult<String>;
    async fn goal(&self) -> ProxyResult<String>;
    async fn total_raised(&self) -> ProxyResult<String>;
    async fn owner(&self) -> ProxyResult<String>;
    async fn participant_count(&self) -> ProxyResult<String>;
    /// Donor record at `index`: `(contributor, amount)`.
    async fn participant_at(&self, index: u64) -> ProxyResult<(String, String)>;

    async fn fund(&self, sender: &Identity, amount: MonetaryAmount)
        -> ProxyResult<PendingTransaction>;
    async fn withdraw(&self, sender: &Identity) -> ProxyResult<PendingTransaction>;
    async fn refund(&self, sender: &Identity) -> ProxyResult<PendingTransaction>;

    /// Resolve once `pending` is final. Waits without a deadline.
    async fn wait_for_finality(
        &self,
        pending: &PendingTransaction,
    ) -> ProxyResult<TransactionReceipt>;
}

/// Account access provider.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Whether a usable wallet exists at all.
    fn is_available(&self) -> bool;

    /// Ask the user to authorize an account.
    async fn request_access(&self) -> ProxyResult<Identity>;

    /// The already-authorized account, if any, without prompting.
    async fn current_identity(&self) -> ProxyResult<Option<Identity>>;
}
