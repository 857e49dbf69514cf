//! # Campaign Client
//!
//! Client for a single on-chain crowdfunding campaign. It keeps a local view
//! of the campaign in sync with the contract and drives the three
//! state-changing actions through a wallet.
//!
//! | Stage          | Entry point(s)                                         |
//! |----------------|--------------------------------------------------------|
//! | Session        | [`CampaignSession::connect`], `auto_connect`, `disconnect` |
//! | Summary read   | [`aggregator::refresh`]                                |
//! | Donor history  | [`ledger::reconstruct`]                                |
//! | Full pass      | [`sync::synchronize`], [`CampaignSession::refresh`]    |
//! | Action menu    | [`policy::evaluate`]                                   |
//! | Transactions   | [`TransactionOrchestrator::submit`], [`CampaignSession::submit`] |
//! | Rendering data | [`CampaignSession::current_view`]                      |
//!
//! ## Architecture
//!
//! The contract and the wallet are reached only through the traits in
//! [`proxy`]; [`rpc`] implements them over Ethereum JSON-RPC. Every stage
//! other than the session is a stateless transformation from collaborator
//! reads to values. The session owns the single mutable state and replaces
//! it whole after each successful pass.

pub mod abi;
pub mod aggregator;
pub mod amount;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod orchestrator;
pub mod policy;
pub mod proxy;
pub mod rpc;
pub mod session;
pub mod sync;
pub mod types;

#[cfg(test)]
mod test_support;

pub use amount::MonetaryAmount;
pub use errors::{CampaignError, ProxyError, Result};
pub use orchestrator::{
    ActionSlot, FailureKind, TransactionIntent, TransactionOrchestrator, TransactionOutcome,
    TransactionPhase,
};
pub use policy::ActionAvailability;
pub use proxy::{CampaignContract, Wallet};
pub use session::{CampaignSession, UserIntent, ViewModel};
pub use sync::CampaignState;
pub use types::{Address, CampaignSnapshot, Contribution, ContributionLedger, DisplayHistory, Identity};
