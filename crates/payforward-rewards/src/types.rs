use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Stable unique identifier of a leaderboard participant (usually a wallet address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One row of the ranked leaderboard as supplied by the leaderboard provider.
///
/// Unknown fields are rejected at deserialization so loosely-shaped payloads
/// never reach the allocation math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RankedEntry {
    pub participant_id: ParticipantId,
    /// Leaderboard position, starting at 1. `None` means the provider had no rank.
    pub rank: Option<u32>,
    pub raw_score: f64,
    pub is_boosted: bool,
    #[serde(default)]
    pub is_opted_out: bool,
}

impl RankedEntry {
    pub fn new(participant_id: impl Into<ParticipantId>, rank: u32, raw_score: f64) -> Self {
        Self {
            participant_id: participant_id.into(),
            rank: Some(rank),
            raw_score,
            is_boosted: false,
            is_opted_out: false,
        }
    }

    pub fn boosted(mut self) -> Self {
        self.is_boosted = true;
        self
    }

    pub fn opted_out(mut self) -> Self {
        self.is_opted_out = true;
        self
    }

    /// Coerce scores the math cannot use (negative, NaN, infinite) to zero.
    pub fn sanitized(mut self) -> Self {
        if !self.raw_score.is_finite() || self.raw_score < 0.0 {
            warn!(
                participant = %self.participant_id,
                raw_score = self.raw_score,
                "⚠️ Invalid raw score coerced to zero"
            );
            self.raw_score = 0.0;
        }
        self
    }
}

/// A ranked entry with its boost applied. Only lives for one computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedEntry {
    pub entry: RankedEntry,
    pub boosted_score: f64,
    /// Index in the snapshot the entry came from. Breaks rank ties.
    pub position: usize,
}

impl BoostedEntry {
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.entry.participant_id
    }

    pub fn rank(&self) -> Option<u32> {
        self.entry.rank
    }

    pub fn raw_score(&self) -> f64 {
        self.entry.raw_score
    }

    pub fn is_boosted(&self) -> bool {
        self.entry.is_boosted
    }

    pub fn is_opted_out(&self) -> bool {
        self.entry.is_opted_out
    }
}

/// Per-participant outcome of one distribution round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResult {
    pub participant_id: ParticipantId,
    pub rank: Option<u32>,
    pub base_score: f64,
    pub boosted_score: f64,
    pub is_boosted: bool,
    pub is_opted_out: bool,
    /// Reward the raw score alone would have earned.
    pub base_reward: f64,
    pub final_reward: f64,
    /// Share of the pool carried forward instead of paid out.
    pub opted_out_contribution: f64,
}

/// Aggregate view of a round, for dashboards and the surrounding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub total_pool: f64,
    pub total_eligible_scores: f64,
    pub opted_out_users: usize,
    pub opted_out_contribution: f64,
    pub multiplier: f64,
}

impl PoolSummary {
    pub fn empty(total_pool: f64) -> Self {
        Self {
            total_pool,
            total_eligible_scores: 0.0,
            opted_out_users: 0,
            opted_out_contribution: 0.0,
            multiplier: 0.0,
        }
    }
}

/// Contribution computed for an opted-out participant, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub participant_id: ParticipantId,
    pub contribution_amount: f64,
}

/// Persisted contribution row, keyed by `participant_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecord {
    pub participant_id: ParticipantId,
    pub contribution_amount: f64,
    pub computed_at: DateTime<Utc>,
}

impl ContributionRecord {
    pub fn from_contribution(contribution: Contribution, computed_at: DateTime<Utc>) -> Self {
        Self {
            participant_id: contribution.participant_id,
            contribution_amount: contribution.contribution_amount,
            computed_at,
        }
    }
}
