//! Campaign summary aggregation.

use tracing::{debug, warn};

use crate::amount::MonetaryAmount;
use crate::errors::{CampaignError, Result};
use crate::proxy::CampaignContract;
use crate::types::{Address, CampaignSnapshot};

/// Read the five summary fields concurrently and assemble a snapshot.
///
/// All-or-nothing: the first failing read (or unparsable numeric field)
/// fails the whole pass and nothing from the sibling reads is kept.
pub async fn refresh<C>(contract: &C) -> Result<CampaignSnapshot>
where
    C: CampaignContract + ?Sized,
{
    let (name, description, goal, total_raised, owner) = futures::try_join!(
        contract.name(),
        contract.description(),
        contract.goal(),
        contract.total_raised(),
        contract.owner()
    )
    .map_err(|e| {
        warn!("Campaign summary read failed: {e}");
        CampaignError::remote_read("campaign summary", e)
    })?;

    let snapshot = CampaignSnapshot {
        name,
        description,
        goal: parse_amount("goal", &goal)?,
        total_raised: parse_amount("total raised", &total_raised)?,
        owner: Address::new(owner),
    };

    debug!(
        "Aggregated snapshot: goal={} raised={} owner={}",
        snapshot.goal, snapshot.total_raised, snapshot.owner
    );
    Ok(snapshot)
}

pub(crate) fn parse_amount(field: &str, raw: &str) -> Result<MonetaryAmount> {
    MonetaryAmount::parse_base_units(raw).map_err(|e| CampaignError::remote_read(field, e))
}
