//! Donation ledger reconstruction.

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::aggregator::parse_amount;
use crate::errors::{CampaignError, Result};
use crate::proxy::CampaignContract;
use crate::types::{Address, Contribution, ContributionLedger};

/// Largest participant count accepted from the contract. Each record is one
/// concurrent read.
pub const MAX_PARTICIPANTS: u64 = 100_000;

/// Rebuild the full donor ledger.
///
/// Reads the participant count, then every record in `[0, n)` concurrently.
/// Results are placed by requested index, not completion order. Any failing
/// read fails the whole reconstruction.
pub async fn reconstruct<C>(contract: &C) -> Result<ContributionLedger>
where
    C: CampaignContract + ?Sized,
{
    let raw_count = contract.participant_count().await.map_err(|e| {
        warn!("Participant count read failed: {e}");
        CampaignError::remote_read("participant count", e)
    })?;
    let count: u64 = raw_count
        .trim()
        .parse()
        .map_err(|_| CampaignError::RemoteRead(format!("participant count: not a count: {raw_count}")))?;

    if count > MAX_PARTICIPANTS {
        warn!("Participant count {count} exceeds {MAX_PARTICIPANTS}");
        return Err(CampaignError::RemoteRead(format!(
            "participant count: {count} exceeds the limit of {MAX_PARTICIPANTS}"
        )));
    }
    if count == 0 {
        debug!("No contributions recorded");
        return Ok(ContributionLedger::empty());
    }

    let reads = (0..count).map(move |index| async move {
        let (contributor, amount) = contract.participant_at(index).await.map_err(|e| {
            warn!("Participant {index} read failed: {e}");
            CampaignError::remote_read(&format!("participant {index}"), e)
        })?;
        Ok::<_, CampaignError>(Contribution {
            contributor: Address::new(contributor),
            amount: parse_amount(&format!("participant {index} amount"), &amount)?,
            index,
        })
    });
    let entries = try_join_all(reads).await?;

    debug!("Reconstructed ledger with {} entries", entries.len());
    Ok(ContributionLedger::new(entries))
}
