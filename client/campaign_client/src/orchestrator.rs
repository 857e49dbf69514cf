//! # Transaction orchestration
//!
//! Every state-changing intent runs through the same machine:
//!
//! ```text
//! Idle ──► Submitting ──► AwaitingFinality ──► Resolved
//!               │                 │
//!               └────────┬────────┘
//!                        ▼
//!                     Failed(kind)
//! ```
//!
//! Each [`ActionSlot`] has its own machine. A slot that is `Submitting` or
//! `AwaitingFinality` rejects a second intent with
//! [`CampaignError::AlreadyInFlight`]; other slots are unaffected.
//!
//! Validation happens before the slot is claimed, so a malformed amount
//! never touches the network. Finality is awaited without a deadline, and
//! a resolved transaction is followed by a full re-synchronization whose
//! result is returned in the [`TransactionOutcome`]. Failures are never
//! retried here; the caller submits again if the user asks to.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::amount::MonetaryAmount;
use crate::errors::{CampaignError, ProxyError, Result};
use crate::proxy::{CampaignContract, PendingTransaction, ProxyResult, TransactionReceipt};
use crate::sync::{self, CampaignState};
use crate::types::Identity;

/// Independent category of state-changing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSlot {
    Fund,
    Withdraw,
    Refund,
}

impl ActionSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fund => "fund",
            Self::Withdraw => "withdraw",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for ActionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested state change. `Fund` carries the amount exactly as the user
/// typed it, in display units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionIntent {
    Fund(String),
    Withdraw,
    Refund,
}

impl TransactionIntent {
    pub fn slot(&self) -> ActionSlot {
        match self {
            Self::Fund(_) => ActionSlot::Fund,
            Self::Withdraw => ActionSlot::Withdraw,
            Self::Refund => ActionSlot::Refund,
        }
    }
}

/// Why a transaction ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum FailureKind {
    /// The user declined to sign.
    UserRejected,
    /// The ledger (or the path to it) refused the call. Reason is verbatim.
    RemoteExecution(String),
}

impl From<ProxyError> for FailureKind {
    fn from(e: ProxyError) -> Self {
        match e {
            ProxyError::UserRejected => FailureKind::UserRejected,
            ProxyError::Execution { reason } => FailureKind::RemoteExecution(reason),
            other => FailureKind::RemoteExecution(other.to_string()),
        }
    }
}

impl From<FailureKind> for CampaignError {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::UserRejected => CampaignError::UserRejected,
            FailureKind::RemoteExecution(reason) => CampaignError::RemoteExecution { reason },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "failure", rename_all = "snake_case")]
pub enum TransactionPhase {
    #[default]
    Idle,
    Submitting,
    AwaitingFinality,
    Resolved,
    Failed(FailureKind),
}

impl TransactionPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingFinality)
    }
}

/// Current phase of every slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotPhases {
    pub fund: TransactionPhase,
    pub withdraw: TransactionPhase,
    pub refund: TransactionPhase,
}

/// A finalized transaction and the campaign state read after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub slot: ActionSlot,
    /// Amount sent, for `Fund`.
    pub amount: Option<MonetaryAmount>,
    pub receipt: TransactionReceipt,
    pub state: CampaignState,
}

/// A validated intent, ready to send.
enum PreparedCall {
    Fund(MonetaryAmount),
    Withdraw,
    Refund,
}

impl PreparedCall {
    fn from_intent(intent: TransactionIntent) -> Result<Self> {
        match intent {
            TransactionIntent::Fund(raw) => {
                let amount = MonetaryAmount::parse_display(&raw)
                    .map_err(|e| CampaignError::InvalidAmount(e.to_string()))?;
                if amount.is_zero() {
                    return Err(CampaignError::InvalidAmount(format!(
                        "amount must be greater than zero: {}",
                        raw.trim()
                    )));
                }
                Ok(Self::Fund(amount))
            }
            TransactionIntent::Withdraw => Ok(Self::Withdraw),
            TransactionIntent::Refund => Ok(Self::Refund),
        }
    }

    fn amount(&self) -> Option<MonetaryAmount> {
        match self {
            Self::Fund(amount) => Some(*amount),
            Self::Withdraw | Self::Refund => None,
        }
    }

    async fn send<C>(&self, contract: &C, sender: &Identity) -> ProxyResult<PendingTransaction>
    where
        C: CampaignContract + ?Sized,
    {
        match self {
            Self::Fund(amount) => contract.fund(sender, *amount).await,
            Self::Withdraw => contract.withdraw(sender).await,
            Self::Refund => contract.refund(sender).await,
        }
    }
}

/// Runs intents through the per-slot state machine.
#[derive(Debug, Default)]
pub struct TransactionOrchestrator {
    phases: Mutex<HashMap<ActionSlot, TransactionPhase>>,
}

impl TransactionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, slot: ActionSlot) -> TransactionPhase {
        self.lock_phases().get(&slot).cloned().unwrap_or_default()
    }

    pub fn phases(&self) -> SlotPhases {
        let phases = self.lock_phases();
        let get = |slot: ActionSlot| phases.get(&slot).cloned().unwrap_or_default();
        SlotPhases {
            fund: get(ActionSlot::Fund),
            withdraw: get(ActionSlot::Withdraw),
            refund: get(ActionSlot::Refund),
        }
    }

    /// Submit `intent` on behalf of `sender` and drive it to a terminal phase.
    pub async fn submit<C>(
        &self,
        contract: &C,
        sender: &Identity,
        intent: TransactionIntent,
    ) -> Result<TransactionOutcome>
    where
        C: CampaignContract + ?Sized,
    {
        let slot = intent.slot();
        let call = PreparedCall::from_intent(intent)?;
        let mut flight = self.claim(slot)?;

        info!("Submitting {slot} transaction from {}", sender.short());
        let pending = match call.send(contract, sender).await {
            Ok(pending) => pending,
            Err(e) => return Err(flight.fail(e)),
        };

        flight.advance(TransactionPhase::AwaitingFinality);
        info!("Awaiting finality for {slot} transaction {}", pending.tx_hash);
        let receipt = match contract.wait_for_finality(&pending).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(flight.fail(e)),
        };
        flight.settle(TransactionPhase::Resolved);
        info!(
            "{slot} transaction {} final in block {:?}",
            receipt.tx_hash, receipt.block_number
        );

        let state = sync::synchronize(contract).await.map_err(|e| {
            warn!(
                "Re-sync after {slot} transaction {} failed: {e}",
                receipt.tx_hash
            );
            e
        })?;

        Ok(TransactionOutcome {
            slot,
            amount: call.amount(),
            receipt,
            state,
        })
    }

    fn claim(&self, slot: ActionSlot) -> Result<InFlight<'_>> {
        let mut phases = self.lock_phases();
        let phase = phases.entry(slot).or_default();
        if phase.is_in_flight() {
            warn!("Rejected {slot} intent: slot already in flight");
            return Err(CampaignError::AlreadyInFlight(slot));
        }
        *phase = TransactionPhase::Submitting;
        Ok(InFlight {
            orchestrator: self,
            slot,
            settled: false,
        })
    }

    fn set_phase(&self, slot: ActionSlot, phase: TransactionPhase) {
        self.lock_phases().insert(slot, phase);
    }

    fn lock_phases(&self) -> MutexGuard<'_, HashMap<ActionSlot, TransactionPhase>> {
        self.phases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claim on a slot for the lifetime of one submission. Dropping it before a
/// terminal phase (the submitting future was abandoned) frees the slot.
struct InFlight<'a> {
    orchestrator: &'a TransactionOrchestrator,
    slot: ActionSlot,
    settled: bool,
}

impl InFlight<'_> {
    fn advance(&self, phase: TransactionPhase) {
        self.orchestrator.set_phase(self.slot, phase);
    }

    fn settle(&mut self, phase: TransactionPhase) {
        self.orchestrator.set_phase(self.slot, phase);
        self.settled = true;
    }

    fn fail(&mut self, e: ProxyError) -> CampaignError {
        let kind = FailureKind::from(e);
        error!("{} transaction failed: {kind:?}", self.slot);
        self.settle(TransactionPhase::Failed(kind.clone()));
        kind.into()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.orchestrator.set_phase(self.slot, TransactionPhase::Idle);
        }
    }
}
