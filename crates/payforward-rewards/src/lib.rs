pub mod allocation;
pub mod boost;
pub mod cache;
pub mod cohort;
pub mod collaborators;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod persist;
pub mod pool;
pub mod storage;
pub mod types;

pub use allocation::RewardAllocator;
pub use boost::{BoostedScoreResolver, DEFAULT_BOOST_FACTOR};
pub use cache::TtlCache;
pub use cohort::{CohortPartitioner, Cohorts};
pub use collaborators::{
    apply_decisions, Decision, DecisionRecord, DecisionRegistry, LeaderboardProvider,
    MemoryDecisionRegistry,
};
pub use config::{EngineConfig, LoggingConfig, RewardsConfig, SponsorContribution, StorageConfig};
pub use display::{format_reward, ZERO_REWARD};
pub use error::{Result, RewardsError};
pub use persist::ContributionPersister;
pub use pool::{PoolAllocation, PoolAllocator};
pub use storage::{open_storage, ContributionStorage, MemoryStorage};
pub use types::{
    BoostedEntry, Contribution, ContributionRecord, ParticipantId, PoolSummary, RankedEntry,
    RewardResult,
};

#[cfg(feature = "rocksdb")]
pub use storage::RocksDbStorage;

use std::sync::Arc;
use tracing::{debug, info};

/// Everything a single round produced.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub results: Vec<RewardResult>,
    pub summary: PoolSummary,
    /// Contribution rows written for the opted-out cohort.
    pub persisted: usize,
}

/// Distributes the sponsor pool over a leaderboard snapshot.
///
/// The calculation methods are pure and may be called concurrently; only
/// `store_opted_out_contributions` and `run_round` touch storage.
pub struct RewardsEngine {
    config: RewardsConfig,
    resolver: BoostedScoreResolver,
    persister: Arc<ContributionPersister>,
}

impl RewardsEngine {
    pub fn new(config: RewardsConfig, storage: Arc<dyn ContributionStorage>) -> Result<Self> {
        config.validate()?;
        let resolver = BoostedScoreResolver::new(config.boost_factor);

        Ok(Self {
            config,
            resolver,
            persister: Arc::new(ContributionPersister::new(storage)),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let storage = open_storage(&config.storage)?;
        Self::new(config.rewards.clone(), storage)
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    pub fn total_pool(&self) -> f64 {
        self.config.total_pool()
    }

    pub fn persister(&self) -> &Arc<ContributionPersister> {
        &self.persister
    }

    /// Sanitize, rank-gate, boost and split the snapshot.
    fn eligible_cohorts(&self, entries: &[RankedEntry]) -> Cohorts {
        let boosted: Vec<BoostedEntry> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| self.config.is_eligible(e.rank))
            .map(|(position, e)| self.resolver.boost(e.clone().sanitized()).at_position(position))
            .collect();

        let cohorts = CohortPartitioner::partition(boosted);
        debug!(
            entries = entries.len(),
            active = cohorts.active.len(),
            opted_out = cohorts.opted_out.len(),
            "Partitioned eligible entries"
        );
        cohorts
    }

    fn compute(&self, entries: &[RankedEntry]) -> (Vec<RewardResult>, PoolSummary) {
        let total_pool = self.total_pool();
        let cohorts = self.eligible_cohorts(entries);
        if cohorts.is_empty() {
            return (Vec::new(), PoolSummary::empty(total_pool));
        }

        let allocation = PoolAllocator::allocate(&cohorts, total_pool);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);
        let opted_out_contribution = allocation.opted_out_pool_share();
        debug_assert!(
            (results.iter().map(|r| r.opted_out_contribution).sum::<f64>()
                - opted_out_contribution)
                .abs()
                <= 1e-9 * total_pool.max(1.0)
        );

        let summary = PoolSummary {
            total_pool,
            total_eligible_scores: allocation.sum_all(),
            opted_out_users: cohorts.opted_out.len(),
            opted_out_contribution,
            multiplier: allocation.multiplier,
        };

        (results, summary)
    }

    /// One result per eligible entry, ascending by rank.
    pub fn calculate_rewards_with_optouts(&self, entries: &[RankedEntry]) -> Vec<RewardResult> {
        self.compute(entries).0
    }

    pub fn get_rewards_summary(&self, entries: &[RankedEntry]) -> PoolSummary {
        self.compute(entries).1
    }

    /// Display string for one participant's reward against the given snapshot.
    pub fn calculate_user_reward(
        &self,
        score: f64,
        rank: Option<u32>,
        is_boosted: bool,
        is_opted_out: bool,
        entries: &[RankedEntry],
    ) -> String {
        if !self.config.is_eligible(rank) || is_opted_out {
            return ZERO_REWARD.to_string();
        }

        let score = if score.is_finite() && score > 0.0 { score } else { 0.0 };
        let multiplier = self.get_rewards_summary(entries).multiplier;
        format_reward(self.resolver.resolve_score(score, is_boosted) * multiplier)
    }

    /// Run the pipeline and persist the opted-out cohort's contributions.
    /// Returns the number of rows written.
    pub async fn store_opted_out_contributions(&self, entries: &[RankedEntry]) -> Result<usize> {
        let results = self.calculate_rewards_with_optouts(entries);
        let contributions = RewardAllocator::contributions(&results);
        self.persister.persist(&contributions).await
    }

    /// Fetch a snapshot, apply registry decisions, compute and persist.
    pub async fn run_round(
        &self,
        provider: &dyn LeaderboardProvider,
        registry: &dyn DecisionRegistry,
    ) -> Result<RoundOutcome> {
        let entries = provider
            .ranked_entries()
            .await
            .map_err(|e| RewardsError::Collaborator(format!("leaderboard provider: {}", e)))?;
        let entries = apply_decisions(entries, registry)
            .await
            .map_err(|e| RewardsError::Collaborator(format!("decision registry: {}", e)))?;

        let (results, summary) = self.compute(&entries);
        let contributions = RewardAllocator::contributions(&results);
        let persisted = self.persister.persist(&contributions).await?;

        info!(
            participants = results.len(),
            opted_out = summary.opted_out_users,
            multiplier = summary.multiplier,
            carried_forward = summary.opted_out_contribution,
            persisted = persisted,
            "🎯 Distribution round complete"
        );

        Ok(RoundOutcome {
            results,
            summary,
            persisted,
        })
    }
}
