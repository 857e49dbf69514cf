//! Application-wide error types.

use thiserror::Error;

use crate::orchestrator::ActionSlot;

/// Every failure the campaign client can surface to a caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("No wallet available: install or configure a wallet to continue")]
    NoWalletAvailable,

    #[error("Wallet connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Not connected: connect a wallet first")]
    NotConnected,

    #[error("Remote read error: {0}")]
    RemoteRead(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("A {0} transaction is already in flight")]
    AlreadyInFlight(ActionSlot),

    #[error("Transaction rejected by the user")]
    UserRejected,

    #[error("Transaction failed: {reason}")]
    RemoteExecution { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure reported by a remote collaborator (contract proxy or wallet).
///
/// The variant is chosen where the failure is detected; callers never
/// inspect the message to decide what kind of failure it was.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("{reason}")]
    Execution { reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl CampaignError {
    /// Any failure while reading campaign state is a read error, whatever
    /// the collaborator reported.
    pub(crate) fn remote_read(context: &str, source: impl std::fmt::Display) -> Self {
        CampaignError::RemoteRead(format!("{context}: {source}"))
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CampaignError>;
