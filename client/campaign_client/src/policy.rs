//! Action availability policy.
//!
//! Only decides which actions are *offered*. Whether an action succeeds is
//! up to the contract: a refund outside the refund window, for instance, is
//! offered here and rejected on-chain as an ordinary transaction failure.

use serde::Serialize;

use crate::types::{CampaignSnapshot, Identity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub can_fund: bool,
    pub can_withdraw: bool,
    pub can_refund: bool,
}

impl ActionAvailability {
    /// Nothing offered.
    pub const fn none() -> Self {
        ActionAvailability {
            can_fund: false,
            can_withdraw: false,
            can_refund: false,
        }
    }
}

/// Derive the available actions for `identity` on the campaign in `snapshot`.
pub fn evaluate(snapshot: &CampaignSnapshot, identity: Option<&Identity>) -> ActionAvailability {
    match identity {
        None => ActionAvailability::none(),
        Some(identity) => ActionAvailability {
            can_fund: true,
            can_withdraw: identity.matches(&snapshot.owner),
            can_refund: true,
        },
    }
}

/// Actions offered before any snapshot has loaded. Withdraw needs the owner
/// and stays off until a snapshot arrives.
pub fn evaluate_unloaded(identity: Option<&Identity>) -> ActionAvailability {
    ActionAvailability {
        can_fund: identity.is_some(),
        can_withdraw: false,
        can_refund: identity.is_some(),
    }
}
