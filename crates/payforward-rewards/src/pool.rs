use crate::cohort::Cohorts;
use crate::types::BoostedEntry;
use tracing::debug;

/// Outcome of splitting the pool between the two cohorts.
///
/// Cohort weights are boosted-score sums divided by `scale`, the largest
/// boosted score in the round. The split only depends on proportions, so
/// scores near `f64::MAX` still sum to a finite weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolAllocation {
    pub total_pool: f64,
    pub scale: f64,
    pub weight_active: f64,
    pub weight_opted_out: f64,
    /// Portion of the pool paid out to the active cohort.
    pub active_pool_share: f64,
    /// Reward per unit of boosted score for active participants.
    pub multiplier: f64,
    /// Reward per unit of weight. Per-entry rewards go through this so tiny
    /// multipliers never lose precision.
    unit_reward: f64,
}

impl PoolAllocation {
    pub fn weight_all(&self) -> f64 {
        self.weight_active + self.weight_opted_out
    }

    /// Sum of all eligible boosted scores, saturating at `f64::MAX`.
    pub fn sum_all(&self) -> f64 {
        (self.weight_all() * self.scale).min(f64::MAX)
    }

    fn weight(&self, score: f64) -> f64 {
        if self.scale > 0.0 {
            score / self.scale
        } else {
            0.0
        }
    }

    /// Reward earned by `score` at this round's multiplier.
    pub fn reward_for(&self, score: f64) -> f64 {
        self.weight(score) * self.unit_reward
    }

    /// Share of the whole pool that `score` represents.
    pub fn contribution_for(&self, score: f64) -> f64 {
        let weight_all = self.weight_all();
        if weight_all > 0.0 {
            (self.weight(score) / weight_all) * self.total_pool
        } else {
            0.0
        }
    }

    /// Portion of the pool carried forward by the opted-out cohort.
    pub fn opted_out_pool_share(&self) -> f64 {
        if self.weight_all() > 0.0 {
            self.total_pool - self.active_pool_share
        } else {
            0.0
        }
    }
}

/// Single source of the active/opted-out split. Both the per-entry results and
/// the summary go through here so they can never disagree on the multiplier.
pub struct PoolAllocator;

impl PoolAllocator {
    pub fn allocate(cohorts: &Cohorts, total_pool: f64) -> PoolAllocation {
        let scale = cohorts
            .active
            .iter()
            .chain(cohorts.opted_out.iter())
            .map(|e| e.boosted_score)
            .fold(0.0, f64::max);

        let weight = |side: &[BoostedEntry]| -> f64 {
            if scale > 0.0 {
                side.iter().map(|e| e.boosted_score / scale).sum()
            } else {
                0.0
            }
        };

        Self::allocate_weights(
            weight(&cohorts.active),
            weight(&cohorts.opted_out),
            scale,
            total_pool,
        )
    }

    /// Split `total_pool` given cohort weights already divided by `scale`.
    /// Pass `scale = 1.0` to allocate plain score sums.
    pub fn allocate_weights(
        weight_active: f64,
        weight_opted_out: f64,
        scale: f64,
        total_pool: f64,
    ) -> PoolAllocation {
        let weight_all = weight_active + weight_opted_out;

        let active_pool_share = if weight_all > 0.0 {
            (weight_active / weight_all) * total_pool
        } else {
            0.0
        };

        let unit_reward = if weight_active > 0.0 {
            active_pool_share / weight_active
        } else {
            0.0
        };

        let multiplier = if scale > 0.0 { unit_reward / scale } else { 0.0 };

        debug!(
            scale,
            weight_active,
            weight_opted_out,
            active_pool_share,
            multiplier,
            "📊 Pool allocated"
        );

        PoolAllocation {
            total_pool,
            scale,
            weight_active,
            weight_opted_out,
            active_pool_share,
            multiplier,
            unit_reward,
        }
    }
}
