//! Session controller.
//!
//! [`CampaignSession`] owns the only mutable state in the client: the
//! connected identity and the latest synchronized [`CampaignState`]. State
//! is swapped as a whole under a lock that is never held across a remote
//! call, and every read hands out copies. The session lives from
//! [`CampaignSession::connect`] to [`CampaignSession::disconnect`]; a pass
//! that completes after a disconnect is discarded.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::{CampaignError, ProxyError, Result};
use crate::orchestrator::{
    ActionSlot, SlotPhases, TransactionIntent, TransactionOrchestrator, TransactionOutcome,
    TransactionPhase,
};
use crate::policy::{self, ActionAvailability};
use crate::proxy::{CampaignContract, Wallet};
use crate::sync::{self, CampaignState};
use crate::types::{Address, CampaignSnapshot, DisplayHistory, Identity};

/// Intents emitted by a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    Connect,
    Fund(String),
    Withdraw,
    Refund,
}

/// Everything a presentation layer needs to render the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub contract_address: Address,
    pub identity: Option<Identity>,
    pub campaign: Option<CampaignView>,
    pub actions: ActionAvailability,
    pub transactions: SlotPhases,
    /// Set when the most recent synchronization failed; the campaign shown
    /// is then the last good one.
    pub last_sync_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignView {
    pub snapshot: CampaignSnapshot,
    pub progress_percent: u8,
    pub history: DisplayHistory,
    /// Donor slots on the ledger, cleared ones included.
    pub ledger_len: usize,
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    campaign: Option<Arc<CampaignState>>,
    last_sync_error: Option<String>,
    /// Bumped on disconnect so late passes from an old session are dropped.
    epoch: u64,
}

pub struct CampaignSession {
    contract: Arc<dyn CampaignContract>,
    wallet: Arc<dyn Wallet>,
    orchestrator: TransactionOrchestrator,
    state: RwLock<SessionState>,
}

impl CampaignSession {
    pub fn new(contract: Arc<dyn CampaignContract>, wallet: Arc<dyn Wallet>) -> Self {
        CampaignSession {
            contract,
            wallet,
            orchestrator: TransactionOrchestrator::new(),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Connect the wallet and load the campaign.
    ///
    /// Idempotent: an existing identity is returned without contacting the
    /// wallet. A failing initial load does not fail the connection; it is
    /// reported through [`ViewModel::last_sync_error`].
    pub async fn connect(&self) -> Result<Identity> {
        if let Some(identity) = self.identity().await {
            debug!("Already connected as {}", identity.short());
            return Ok(identity);
        }
        if !self.wallet.is_available() {
            warn!("Connect requested but no wallet is available");
            return Err(CampaignError::NoWalletAvailable);
        }

        let identity = self.wallet.request_access().await.map_err(|e| {
            warn!("Wallet access failed: {e}");
            match e {
                ProxyError::UserRejected => {
                    CampaignError::ConnectionRejected("user rejected the request".to_string())
                }
                other => CampaignError::ConnectionRejected(other.to_string()),
            }
        })?;

        {
            let mut state = self.state.write().await;
            if let Some(existing) = &state.identity {
                return Ok(existing.clone());
            }
            state.identity = Some(identity.clone());
        }
        info!("Connected as {}", identity.short());

        if let Err(e) = self.refresh().await {
            warn!("Initial campaign load failed: {e}");
        }
        Ok(identity)
    }

    /// Connect without prompting when the wallet already has an authorized
    /// account. Returns `None` when it has not.
    pub async fn auto_connect(&self) -> Result<Option<Identity>> {
        if !self.wallet.is_available() {
            return Err(CampaignError::NoWalletAvailable);
        }
        match self.wallet.current_identity().await {
            Ok(Some(_)) => self.connect().await.map(Some),
            Ok(None) => {
                debug!("No previously authorized account");
                Ok(None)
            }
            Err(e) => Err(CampaignError::ConnectionRejected(e.to_string())),
        }
    }

    /// Tear the session down. In-flight passes finishing later are discarded.
    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        let epoch = state.epoch + 1;
        *state = SessionState {
            epoch,
            ..SessionState::default()
        };
        info!("Session disconnected");
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.identity.clone()
    }

    /// Run a full synchronization pass and replace the campaign state with
    /// its result. On failure the previous state is kept.
    pub async fn refresh(&self) -> Result<()> {
        let epoch = self.state.read().await.epoch;
        match sync::synchronize(self.contract.as_ref()).await {
            Ok(campaign) => {
                self.install(epoch, campaign).await;
                Ok(())
            }
            Err(e) => {
                self.record_sync_error(epoch, &e).await;
                Err(e)
            }
        }
    }

    /// Submit a transaction as the connected identity. On success the
    /// session already holds the post-transaction campaign state.
    pub async fn submit(&self, intent: TransactionIntent) -> Result<TransactionOutcome> {
        let (identity, epoch) = {
            let state = self.state.read().await;
            (state.identity.clone(), state.epoch)
        };
        let identity = identity.ok_or(CampaignError::NotConnected)?;

        match self
            .orchestrator
            .submit(self.contract.as_ref(), &identity, intent)
            .await
        {
            Ok(outcome) => {
                self.install(epoch, outcome.state.clone()).await;
                Ok(outcome)
            }
            Err(e) => {
                if matches!(e, CampaignError::RemoteRead(_)) {
                    self.record_sync_error(epoch, &e).await;
                }
                Err(e)
            }
        }
    }

    /// Dispatch a presentation intent and return the resulting view.
    pub async fn handle(&self, intent: UserIntent) -> Result<ViewModel> {
        match intent {
            UserIntent::Connect => {
                self.connect().await?;
            }
            UserIntent::Fund(raw) => {
                self.submit(TransactionIntent::Fund(raw)).await?;
            }
            UserIntent::Withdraw => {
                self.submit(TransactionIntent::Withdraw).await?;
            }
            UserIntent::Refund => {
                self.submit(TransactionIntent::Refund).await?;
            }
        }
        Ok(self.current_view().await)
    }

    pub fn phase(&self, slot: ActionSlot) -> TransactionPhase {
        self.orchestrator.phase(slot)
    }

    /// Build a fresh view from the current state.
    pub async fn current_view(&self) -> ViewModel {
        let (identity, campaign, last_sync_error) = {
            let state = self.state.read().await;
            (
                state.identity.clone(),
                state.campaign.clone(),
                state.last_sync_error.clone(),
            )
        };

        let actions = match campaign.as_deref() {
            Some(c) => policy::evaluate(&c.snapshot, identity.as_ref()),
            None => policy::evaluate_unloaded(identity.as_ref()),
        };
        let campaign = campaign.as_deref().map(|c| CampaignView {
            snapshot: c.snapshot.clone(),
            progress_percent: c.snapshot.progress_percent(),
            history: c.ledger.display_history(),
            ledger_len: c.ledger.len(),
        });

        ViewModel {
            contract_address: self.contract.address().clone(),
            identity,
            campaign,
            actions,
            transactions: self.orchestrator.phases(),
            last_sync_error,
        }
    }

    async fn install(&self, epoch: u64, campaign: CampaignState) {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("Discarding campaign state from a closed session");
            return;
        }
        state.campaign = Some(Arc::new(campaign));
        state.last_sync_error = None;
    }

    async fn record_sync_error(&self, epoch: u64, e: &CampaignError) {
        let mut state = self.state.write().await;
        if state.epoch == epoch {
            state.last_sync_error = Some(e.to_string());
        }
    }
}
