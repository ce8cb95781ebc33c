use crate::cohort::Cohorts;
use crate::pool::PoolAllocation;
use crate::types::{BoostedEntry, Contribution, RewardResult};

pub struct RewardAllocator;

impl RewardAllocator {
    /// Reward (active) or carry-forward contribution (opted out) for one entry.
    /// The allocation carries the round's multiplier, pool and score total.
    pub fn allocate(entry: &BoostedEntry, allocation: &PoolAllocation) -> RewardResult {
        let (base_reward, final_reward, opted_out_contribution) = if entry.is_opted_out() {
            (0.0, 0.0, allocation.contribution_for(entry.boosted_score))
        } else {
            (
                allocation.reward_for(entry.raw_score()),
                allocation.reward_for(entry.boosted_score),
                0.0,
            )
        };

        RewardResult {
            participant_id: entry.participant_id().clone(),
            rank: entry.rank(),
            base_score: entry.raw_score(),
            boosted_score: entry.boosted_score,
            is_boosted: entry.is_boosted(),
            is_opted_out: entry.is_opted_out(),
            base_reward,
            final_reward,
            opted_out_contribution,
        }
    }

    /// Results for both cohorts, ordered by ascending rank. Ties keep their
    /// snapshot order whichever cohort they landed in.
    pub fn allocate_all(cohorts: &Cohorts, allocation: &PoolAllocation) -> Vec<RewardResult> {
        let mut entries: Vec<&BoostedEntry> =
            cohorts.active.iter().chain(cohorts.opted_out.iter()).collect();
        entries.sort_by_key(|e| (e.rank().unwrap_or(u32::MAX), e.position));

        entries
            .into_iter()
            .map(|entry| Self::allocate(entry, allocation))
            .collect()
    }

    pub fn contributions(results: &[RewardResult]) -> Vec<Contribution> {
        results
            .iter()
            .filter(|r| r.is_opted_out)
            .map(|r| Contribution {
                participant_id: r.participant_id.clone(),
                contribution_amount: r.opted_out_contribution,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boost::BoostedScoreResolver;
    use crate::cohort::CohortPartitioner;
    use crate::pool::PoolAllocator;
    use crate::types::RankedEntry;

    fn cohorts(entries: Vec<RankedEntry>) -> Cohorts {
        let resolver = BoostedScoreResolver::default();
        CohortPartitioner::partition(
            entries
                .into_iter()
                .enumerate()
                .map(|(i, e)| resolver.boost(e).at_position(i))
                .collect(),
        )
    }

    #[test]
    fn test_active_and_opted_out_results() {
        let cohorts = cohorts(vec![
            RankedEntry::new("a", 1, 1000.0).boosted(),
            RankedEntry::new("b", 2, 500.0),
            RankedEntry::new("c", 3, 300.0).opted_out(),
        ]);
        let allocation = PoolAllocator::allocate(&cohorts, 5000.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);

        assert_eq!(results.len(), 3);
        let a = &results[0];
        assert!((a.boosted_score - 1100.0).abs() < 1e-9);
        assert!((a.base_reward - 1000.0 * allocation.multiplier).abs() < 1e-9);
        assert!((a.final_reward - 2894.736842).abs() < 1e-5);
        assert_eq!(a.opted_out_contribution, 0.0);

        let c = &results[2];
        assert_eq!(c.final_reward, 0.0);
        assert_eq!(c.base_reward, 0.0);
        assert!((c.opted_out_contribution - 789.473684).abs() < 1e-5);
    }

    #[test]
    fn test_results_sorted_by_rank_with_stable_ties() {
        let cohorts = cohorts(vec![
            RankedEntry::new("third", 3, 10.0),
            RankedEntry::new("first", 1, 10.0).opted_out(),
            RankedEntry::new("tie-a", 2, 10.0),
            RankedEntry::new("tie-b", 2, 10.0),
        ]);
        let allocation = PoolAllocator::allocate(&cohorts, 100.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);

        let order: Vec<&str> = results.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(order, vec!["first", "tie-a", "tie-b", "third"]);
    }

    #[test]
    fn test_rank_ties_across_cohorts_keep_snapshot_order() {
        let cohorts = cohorts(vec![
            RankedEntry::new("x", 2, 10.0).opted_out(),
            RankedEntry::new("y", 2, 10.0),
            RankedEntry::new("w", 1, 10.0).opted_out(),
            RankedEntry::new("z", 2, 10.0).opted_out(),
        ]);
        let allocation = PoolAllocator::allocate(&cohorts, 100.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);

        let order: Vec<&str> = results.iter().map(|r| r.participant_id.as_str()).collect();
        assert_eq!(order, vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn test_huge_scores_conserve_pool() {
        let cohorts = cohorts(vec![
            RankedEntry::new("a", 1, f64::MAX).boosted(),
            RankedEntry::new("b", 2, 1e308),
            RankedEntry::new("c", 3, 1e308).opted_out(),
        ]);
        let allocation = PoolAllocator::allocate(&cohorts, 5000.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);

        assert!(results.iter().all(|r| r.final_reward.is_finite()));
        let total: f64 = results
            .iter()
            .map(|r| r.final_reward + r.opted_out_contribution)
            .sum();
        assert!((total - 5000.0).abs() < 1e-6);
        // b and c carry equal weight
        assert!((results[1].final_reward - results[2].opted_out_contribution).abs() < 1e-6);
    }

    #[test]
    fn test_contributions_only_for_opted_out() {
        let cohorts = cohorts(vec![
            RankedEntry::new("a", 1, 10.0),
            RankedEntry::new("b", 2, 10.0).opted_out(),
        ]);
        let allocation = PoolAllocator::allocate(&cohorts, 100.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);
        let contributions = RewardAllocator::contributions(&results);

        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].participant_id.as_str(), "b");
        assert!((contributions[0].contribution_amount - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sum_guard() {
        let cohorts = cohorts(vec![RankedEntry::new("z", 1, 0.0).opted_out()]);
        let allocation = PoolAllocator::allocate(&cohorts, 100.0);
        let results = RewardAllocator::allocate_all(&cohorts, &allocation);
        assert_eq!(results[0].opted_out_contribution, 0.0);
        assert_eq!(results[0].final_reward, 0.0);
    }
}
