//! # Types
//!
//! Values shared by every stage of the campaign client.
//!
//! ## Design decisions
//!
//! ### Snapshots are replaced, never patched
//!
//! A [`CampaignSnapshot`] is built in one aggregation pass and is immutable
//! afterwards. A later pass produces a new snapshot; there is no setter for
//! individual fields, so a reader can never observe a mix of old and new
//! values.
//!
//! ### Zeroed ledger slots
//!
//! The contract keeps one record per donor index and zeroes the amount when
//! the donor is refunded or the owner withdraws. The [`ContributionLedger`]
//! keeps those slots so that indices stay aligned with the contract;
//! [`ContributionLedger::display_history`] hides them.
//!
//! ```text
//! ledger:  [0:(A,5)] [1:(B,0)] [2:(C,2)]   len = 3
//! display: [0:(A,5)]           [2:(C,2)]
//! ```

use std::fmt;

use serde::Serialize;

use crate::amount::MonetaryAmount;

/// An account address on the ledger.
///
/// Addresses are hex strings whose letter case carries no identity (mixed
/// case is only a checksum), so comparisons go through [`Address::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

/// The connected actor. Supplied by the wallet, never persisted.
pub type Identity = Address;

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Address(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive address equality.
    pub fn matches(&self, other: &Address) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Abbreviated form for labels: `0x1234...abcd`.
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        if s.len() <= 10 || !s.is_ascii() {
            return s.to_string();
        }
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Campaign summary fields, all read in the same aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSnapshot {
    pub name: String,
    pub description: String,
    /// Target amount.
    pub goal: MonetaryAmount,
    /// Amount currently held by the campaign.
    pub total_raised: MonetaryAmount,
    /// Address allowed to withdraw.
    pub owner: Address,
}

impl CampaignSnapshot {
    /// Funding progress in whole percent, capped at 100. A zero goal reports 0.
    pub fn progress_percent(&self) -> u8 {
        let goal = self.goal.base_units();
        let raised = self.total_raised.base_units();
        if goal == 0 {
            return 0;
        }
        if raised >= goal {
            return 100;
        }
        // raised < goal here, so the quotient is < 100.
        match raised.checked_mul(100) {
            Some(scaled) => (scaled / goal) as u8,
            None => ((raised >> 7) * 100 / (goal >> 7).max(1)).min(99) as u8,
        }
    }
}

/// One donor record, at its ledger index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub contributor: Address,
    pub amount: MonetaryAmount,
    pub index: u64,
}

impl Contribution {
    /// `true` when the slot has been refunded or withdrawn.
    pub fn is_cleared(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Every donor record, in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContributionLedger {
    entries: Vec<Contribution>,
}

impl ContributionLedger {
    /// Build a ledger from records; they are sorted by index.
    pub fn new(mut entries: Vec<Contribution>) -> Self {
        entries.sort_by_key(|c| c.index);
        ContributionLedger { entries }
    }

    pub fn empty() -> Self {
        ContributionLedger::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Contribution] {
        &self.entries
    }

    /// The history as it should be shown: "no contributions yet" when the
    /// contract has never recorded a donor, otherwise the non-zero entries
    /// (which may be an empty list if every slot was cleared).
    pub fn display_history(&self) -> DisplayHistory {
        if self.entries.is_empty() {
            return DisplayHistory::NoContributionsYet;
        }
        DisplayHistory::Entries(
            self.entries
                .iter()
                .filter(|c| !c.is_cleared())
                .cloned()
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "entries", rename_all = "snake_case")]
pub enum DisplayHistory {
    NoContributionsYet,
    Entries(Vec<Contribution>),
}
