use crate::error::Result;
use crate::storage::ContributionStorage;
use crate::types::{Contribution, ContributionRecord, ParticipantId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Writes opted-out contributions to the record store.
///
/// Every call is a keyed upsert, so re-running a round (or running a newer
/// snapshot) converges on the latest value per participant. Concurrent runs
/// are last-write-wins per row; ordering beyond that is up to the store.
pub struct ContributionPersister {
    storage: Arc<dyn ContributionStorage>,
}

impl ContributionPersister {
    pub fn new(storage: Arc<dyn ContributionStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn ContributionStorage> {
        &self.storage
    }

    /// Returns the number of rows written. An empty batch is a no-op.
    pub async fn persist(&self, contributions: &[Contribution]) -> Result<usize> {
        if contributions.is_empty() {
            return Ok(0);
        }

        let computed_at = Utc::now();
        let records = Self::dedup_last_wins(contributions)
            .into_iter()
            .map(|c| ContributionRecord::from_contribution(c, computed_at))
            .collect::<Vec<_>>();

        let total: f64 = records.iter().map(|r| r.contribution_amount).sum();

        if let Err(e) = self.storage.upsert_contributions(&records).await {
            warn!(
                batch_size = records.len(),
                error = %e,
                "❌ Contribution batch rejected"
            );
            return Err(e.into());
        }

        info!(
            batch_size = records.len(),
            total_contribution = total,
            computed_at = %computed_at,
            "📝 Opted-out contributions persisted"
        );

        Ok(records.len())
    }

    pub async fn get_contribution(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Option<ContributionRecord>> {
        Ok(self.storage.get_contribution(participant_id).await?)
    }

    /// Carry-forward pool recorded so far.
    pub async fn total_contributions(&self) -> Result<f64> {
        let records = self.storage.get_all_contributions().await?;
        Ok(records.iter().map(|r| r.contribution_amount).sum())
    }

    fn dedup_last_wins(contributions: &[Contribution]) -> Vec<Contribution> {
        let mut positions: HashMap<&ParticipantId, usize> = HashMap::new();
        let mut unique: Vec<Contribution> = Vec::with_capacity(contributions.len());

        for contribution in contributions {
            match positions.get(&contribution.participant_id) {
                Some(&idx) => unique[idx] = contribution.clone(),
                None => {
                    positions.insert(&contribution.participant_id, unique.len());
                    unique.push(contribution.clone());
                }
            }
        }

        unique
    }
}
