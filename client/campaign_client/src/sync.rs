//! One full synchronization pass: summary snapshot plus donor ledger.

use serde::Serialize;
use tracing::info;

use crate::aggregator;
use crate::errors::Result;
use crate::ledger;
use crate::proxy::CampaignContract;
use crate::types::{CampaignSnapshot, ContributionLedger};

/// Campaign state produced by a single pass. Replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignState {
    pub snapshot: CampaignSnapshot,
    pub ledger: ContributionLedger,
}

/// Run the aggregator and the ledger reconstructor together. Either failing
/// fails the pass.
pub async fn synchronize<C>(contract: &C) -> Result<CampaignState>
where
    C: CampaignContract + ?Sized,
{
    let (snapshot, ledger) =
        futures::try_join!(aggregator::refresh(contract), ledger::reconstruct(contract))?;

    info!(
        "Synchronized campaign '{}': raised {} of {} from {} donor slots",
        snapshot.name,
        snapshot.total_raised,
        snapshot.goal,
        ledger.len()
    );
    Ok(CampaignState { snapshot, ledger })
}
