//! Interfaces to the systems around the engine.
//!
//! The leaderboard provider supplies ranked entries and the decision registry
//! records who chose to pay their share forward. Neither is implemented here
//! beyond an in-memory registry used by tests and local runs.

use crate::types::{ParticipantId, RankedEntry};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[async_trait]
pub trait LeaderboardProvider: Send + Sync {
    /// Current snapshot, in any order, possibly including ranks past the threshold.
    async fn ranked_entries(&self) -> Result<Vec<RankedEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Keep the allocated reward.
    OptIn,
    /// Forgo the reward and carry the share forward.
    OptOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub participant_id: ParticipantId,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
}

#[async_trait]
pub trait DecisionRegistry: Send + Sync {
    async fn record_decision(
        &self,
        participant_id: ParticipantId,
        decision: Decision,
    ) -> Result<()>;
    async fn get_decision(&self, participant_id: &ParticipantId) -> Result<Option<DecisionRecord>>;
    /// Latest decision for each of `participant_ids` that has one.
    async fn decisions_for(
        &self,
        participant_ids: &[ParticipantId],
    ) -> Result<HashMap<ParticipantId, Decision>>;
}

/// Latest decision per participant wins.
pub struct MemoryDecisionRegistry {
    decisions: Arc<RwLock<HashMap<ParticipantId, DecisionRecord>>>,
}

impl Default for MemoryDecisionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDecisionRegistry {
    pub fn new() -> Self {
        Self {
            decisions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DecisionRegistry for MemoryDecisionRegistry {
    async fn record_decision(
        &self,
        participant_id: ParticipantId,
        decision: Decision,
    ) -> Result<()> {
        if participant_id.is_empty() {
            bail!("Cannot record a decision for an empty participant id");
        }

        let record = DecisionRecord {
            participant_id: participant_id.clone(),
            decision,
            decided_at: Utc::now(),
        };

        let previous = self
            .decisions
            .write()
            .await
            .insert(participant_id.clone(), record)
            .map(|p| p.decision);

        info!(
            participant = %participant_id,
            decision = ?decision,
            previous = ?previous,
            "🔄 Decision recorded"
        );
        Ok(())
    }

    async fn get_decision(&self, participant_id: &ParticipantId) -> Result<Option<DecisionRecord>> {
        Ok(self.decisions.read().await.get(participant_id).cloned())
    }

    async fn decisions_for(
        &self,
        participant_ids: &[ParticipantId],
    ) -> Result<HashMap<ParticipantId, Decision>> {
        let decisions = self.decisions.read().await;
        Ok(participant_ids
            .iter()
            .filter_map(|id| decisions.get(id).map(|r| (id.clone(), r.decision)))
            .collect())
    }
}

/// Overlay registry decisions onto the provider's entries. Participants with
/// no recorded decision keep the flag the provider sent.
pub async fn apply_decisions(
    mut entries: Vec<RankedEntry>,
    registry: &dyn DecisionRegistry,
) -> Result<Vec<RankedEntry>> {
    let ids: Vec<ParticipantId> = entries.iter().map(|e| e.participant_id.clone()).collect();
    let decisions = registry.decisions_for(&ids).await?;

    for entry in entries.iter_mut() {
        if let Some(decision) = decisions.get(&entry.participant_id) {
            entry.is_opted_out = *decision == Decision::OptOut;
        }
    }

    debug!(
        entries = entries.len(),
        decisions = decisions.len(),
        "Applied registry decisions"
    );
    Ok(entries)
}
