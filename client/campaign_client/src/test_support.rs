//! In-memory contract and wallet used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::amount::MonetaryAmount;
use crate::errors::ProxyError;
use crate::proxy::{
    CampaignContract, PendingTransaction, ProxyResult, TransactionReceipt, Wallet,
};
use crate::types::{Address, Identity};

pub const OWNER: &str = "0xABC0000000000000000000000000000000000123";
pub const DONOR: &str = "0xdef0000000000000000000000000000000000456";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadField {
    Name,
    Description,
    Goal,
    TotalRaised,
    Owner,
}

#[derive(Debug, Clone)]
enum Effect {
    Fund { sender: String, amount: u128 },
    Withdraw,
    Refund { sender: String },
}

#[derive(Debug)]
struct MockState {
    name: String,
    description: String,
    goal: String,
    total_raised: u128,
    raw_total_raised: Option<String>,
    owner: String,
    donors: Vec<(String, u128)>,
    raw_participant_count: Option<String>,
    failing_reads: HashSet<ReadField>,
    failing_participants: HashSet<u64>,
    participant_delays: HashMap<u64, Duration>,
    participant_completion: Vec<u64>,
    submit_failure: Option<ProxyError>,
    finality_failure: Option<ProxyError>,
    pending: HashMap<String, Effect>,
    next_tx: u64,
}

pub struct MockContract {
    address: Address,
    state: Mutex<MockState>,
    summary_passes: AtomicUsize,
    participant_reads: AtomicUsize,
    write_calls: AtomicUsize,
    finality_gate: Mutex<Option<Arc<Notify>>>,
    submitted: Arc<Notify>,
}

pub struct MockContractBuilder {
    state: MockState,
}

impl MockContractBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.state.name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.state.description = description.to_string();
        self
    }

    pub fn goal(mut self, goal: u128) -> Self {
        self.state.goal = goal.to_string();
        self
    }

    pub fn total_raised(mut self, total: u128) -> Self {
        self.state.total_raised = total;
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.state.owner = owner.to_string();
        self
    }

    /// Append a donor record; `total_raised` grows by `amount`.
    pub fn donor(mut self, who: &str, amount: u128) -> Self {
        self.state.donors.push((who.to_string(), amount));
        self.state.total_raised += amount;
        self
    }

    pub fn build(self) -> MockContract {
        MockContract {
            address: Address::new("0x7675b4293a2d5d784a7d975dea1600342c9de4f8"),
            state: Mutex::new(self.state),
            summary_passes: AtomicUsize::new(0),
            participant_reads: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            finality_gate: Mutex::new(None),
            submitted: Arc::new(Notify::new()),
        }
    }
}

impl MockContract {
    pub fn builder() -> MockContractBuilder {
        MockContractBuilder {
            state: MockState {
                name: "Campaign".to_string(),
                description: "A campaign".to_string(),
                goal: "1000".to_string(),
                total_raised: 0,
                raw_total_raised: None,
                owner: OWNER.to_string(),
                donors: Vec::new(),
                raw_participant_count: None,
                failing_reads: HashSet::new(),
                failing_participants: HashSet::new(),
                participant_delays: HashMap::new(),
                participant_completion: Vec::new(),
                submit_failure: None,
                finality_failure: None,
                pending: HashMap::new(),
                next_tx: 1,
            },
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn fail_read(&self, field: ReadField) {
        self.lock().failing_reads.insert(field);
    }

    pub fn heal_reads(&self) {
        let mut state = self.lock();
        state.failing_reads.clear();
        state.failing_participants.clear();
    }

    pub fn set_raw_goal(&self, raw: &str) {
        self.lock().goal = raw.to_string();
    }

    pub fn set_raw_total_raised(&self, raw: &str) {
        self.lock().raw_total_raised = Some(raw.to_string());
    }

    pub fn set_raw_participant_count(&self, raw: &str) {
        self.lock().raw_participant_count = Some(raw.to_string());
    }

    pub fn fail_participant(&self, index: u64) {
        self.lock().failing_participants.insert(index);
    }

    pub fn delay_participant(&self, index: u64, delay: Duration) {
        self.lock().participant_delays.insert(index, delay);
    }

    pub fn participant_completion_order(&self) -> Vec<u64> {
        self.lock().participant_completion.clone()
    }

    /// Next state-changing call fails at submission.
    pub fn fail_submit(&self, error: ProxyError) {
        self.lock().submit_failure = Some(error);
    }

    /// Next transaction reaching finality is reported as failed.
    pub fn fail_finality(&self, error: ProxyError) {
        self.lock().finality_failure = Some(error);
    }

    /// Make `wait_for_finality` block until the returned gate is notified.
    pub fn hold_finality(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.finality_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Notified each time a state-changing call is accepted.
    pub fn submitted(&self) -> Arc<Notify> {
        self.submitted.clone()
    }

    /// Completed-or-attempted summary aggregation passes.
    pub fn summary_passes(&self) -> usize {
        self.summary_passes.load(Ordering::SeqCst)
    }

    pub fn participant_reads(&self) -> usize {
        self.participant_reads.load(Ordering::SeqCst)
    }

    /// State-changing calls that reached the contract.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn total_raised_units(&self) -> u128 {
        self.lock().total_raised
    }

    pub fn donor_records(&self) -> Vec<(String, u128)> {
        self.lock().donors.clone()
    }

    fn read(&self, field: ReadField, value: impl FnOnce(&MockState) -> String) -> ProxyResult<String> {
        let state = self.lock();
        if state.failing_reads.contains(&field) {
            return Err(ProxyError::Transport(format!("{field:?} read timed out")));
        }
        Ok(value(&state))
    }

    fn accept(&self, effect: Effect) -> ProxyResult<PendingTransaction> {
        let mut state = self.lock();
        if let Some(error) = state.submit_failure.take() {
            return Err(error);
        }
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let tx_hash = format!("0x{:064x}", state.next_tx);
        state.next_tx += 1;
        state.pending.insert(tx_hash.clone(), effect);
        drop(state);
        self.submitted.notify_one();
        Ok(PendingTransaction { tx_hash })
    }

    fn apply(state: &mut MockState, effect: Effect) {
        match effect {
            Effect::Fund { sender, amount } => {
                state.donors.push((sender, amount));
                state.total_raised += amount;
            }
            Effect::Withdraw => {
                state.total_raised = 0;
            }
            Effect::Refund { sender } => {
                for (who, amount) in state.donors.iter_mut() {
                    if who.eq_ignore_ascii_case(&sender) {
                        state.total_raised -= *amount;
                        *amount = 0;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl CampaignContract for MockContract {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn name(&self) -> ProxyResult<String> {
        self.summary_passes.fetch_add(1, Ordering::SeqCst);
        self.read(ReadField::Name, |s| s.name.clone())
    }

    async fn description(&self) -> ProxyResult<String> {
        self.read(ReadField::Description, |s| s.description.clone())
    }

    async fn goal(&self) -> ProxyResult<String> {
        self.read(ReadField::Goal, |s| s.goal.clone())
    }

    async fn total_raised(&self) -> ProxyResult<String> {
        self.read(ReadField::TotalRaised, |s| {
            s.raw_total_raised
                .clone()
                .unwrap_or_else(|| s.total_raised.to_string())
        })
    }

    async fn owner(&self) -> ProxyResult<String> {
        self.read(ReadField::Owner, |s| s.owner.clone())
    }

    async fn participant_count(&self) -> ProxyResult<String> {
        let state = self.lock();
        Ok(state
            .raw_participant_count
            .clone()
            .unwrap_or_else(|| state.donors.len().to_string()))
    }

    async fn participant_at(&self, index: u64) -> ProxyResult<(String, String)> {
        self.participant_reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.lock().participant_delays.get(&index).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.participant_completion.push(index);
        if state.failing_participants.contains(&index) {
            return Err(ProxyError::Execution {
                reason: format!("donor {index} lookup reverted"),
            });
        }
        state
            .donors
            .get(index as usize)
            .map(|(who, amount)| (who.clone(), amount.to_string()))
            .ok_or_else(|| ProxyError::Execution {
                reason: "index out of bounds".to_string(),
            })
    }

    async fn fund(
        &self,
        sender: &Identity,
        amount: MonetaryAmount,
    ) -> ProxyResult<PendingTransaction> {
        self.accept(Effect::Fund {
            sender: sender.as_str().to_string(),
            amount: amount.base_units(),
        })
    }

    async fn withdraw(&self, _sender: &Identity) -> ProxyResult<PendingTransaction> {
        self.accept(Effect::Withdraw)
    }

    async fn refund(&self, sender: &Identity) -> ProxyResult<PendingTransaction> {
        self.accept(Effect::Refund {
            sender: sender.as_str().to_string(),
        })
    }

    async fn wait_for_finality(
        &self,
        pending: &PendingTransaction,
    ) -> ProxyResult<TransactionReceipt> {
        let gate = self.finality_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.lock();
        let effect = state.pending.remove(&pending.tx_hash);
        if let Some(error) = state.finality_failure.take() {
            return Err(error);
        }
        if let Some(effect) = effect {
            Self::apply(&mut state, effect);
        }
        Ok(TransactionReceipt {
            tx_hash: pending.tx_hash.clone(),
            block_number: Some(state.next_tx),
            finalized_at: Utc::now(),
        })
    }
}

pub struct MockWallet {
    available: bool,
    authorized: Mutex<Option<Identity>>,
    account: Identity,
    reject: bool,
    access_requests: AtomicUsize,
}

impl MockWallet {
    /// A wallet that grants `account` when asked.
    pub fn granting(account: &str) -> Self {
        MockWallet {
            available: true,
            authorized: Mutex::new(None),
            account: Address::new(account),
            reject: false,
            access_requests: AtomicUsize::new(0),
        }
    }

    /// A wallet that already authorized `account` in an earlier session.
    pub fn authorized(account: &str) -> Self {
        let wallet = Self::granting(account);
        *wallet.authorized.lock().unwrap() = Some(Address::new(account));
        wallet
    }

    pub fn rejecting() -> Self {
        MockWallet {
            reject: true,
            ..Self::granting(DONOR)
        }
    }

    pub fn missing() -> Self {
        MockWallet {
            available: false,
            ..Self::granting(DONOR)
        }
    }

    pub fn access_requests(&self) -> usize {
        self.access_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn request_access(&self) -> ProxyResult<Identity> {
        self.access_requests.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(ProxyError::UserRejected);
        }
        *self.authorized.lock().unwrap() = Some(self.account.clone());
        Ok(self.account.clone())
    }

    async fn current_identity(&self) -> ProxyResult<Option<Identity>> {
        Ok(self.authorized.lock().unwrap().clone())
    }
}
