use payforward_rewards::{storage::MemoryStorage, RankedEntry, RewardsConfig, RewardsEngine};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

prop_compose! {
    fn arb_entry(max_rank: u32)
        (rank in 1u32..=max_rank,
         raw_score in 0.0f64..100_000.0,
         is_boosted in any::<bool>(),
         is_opted_out in any::<bool>()) -> (u32, f64, bool, bool) {
        (rank, raw_score, is_boosted, is_opted_out)
    }
}

prop_compose! {
    fn arb_leaderboard(max_len: usize)
        (rows in prop::collection::vec(arb_entry(300), 1..max_len)) -> Vec<RankedEntry> {
        rows.into_iter()
            .enumerate()
            .map(|(i, (rank, raw_score, is_boosted, is_opted_out))| RankedEntry {
                participant_id: format!("p{}", i).into(),
                rank: Some(rank),
                raw_score,
                is_boosted,
                is_opted_out,
            })
            .collect()
    }
}

fn engine(total_pool: f64) -> RewardsEngine {
    RewardsEngine::new(
        RewardsConfig::with_total_pool(total_pool),
        Arc::new(MemoryStorage::new()),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_pool_conserved(
        entries in arb_leaderboard(120),
        total_pool in 1.0f64..1_000_000.0
    ) {
        let engine = engine(total_pool);
        let results = engine.calculate_rewards_with_optouts(&entries);
        let sum_all: f64 = results.iter().map(|r| r.boosted_score).sum();

        let distributed: f64 = results
            .iter()
            .map(|r| r.final_reward + r.opted_out_contribution)
            .sum();

        if sum_all > 0.0 {
            prop_assert!((distributed - total_pool).abs() < 1e-6 * total_pool);
        } else {
            prop_assert_eq!(distributed, 0.0);
        }
    }

    #[test]
    fn prop_only_eligible_ranks_returned(entries in arb_leaderboard(120)) {
        let engine = engine(5000.0);
        let results = engine.calculate_rewards_with_optouts(&entries);

        let expected = entries.iter().filter(|e| matches!(e.rank, Some(r) if r <= 200)).count();
        prop_assert_eq!(results.len(), expected);
        prop_assert!(results.windows(2).all(|w| w[0].rank <= w[1].rank));
    }

    #[test]
    fn prop_result_invariants(entries in arb_leaderboard(80)) {
        let engine = engine(5000.0);
        let multiplier = engine.get_rewards_summary(&entries).multiplier;

        for r in engine.calculate_rewards_with_optouts(&entries) {
            prop_assert!(r.boosted_score >= r.base_score);
            if r.is_opted_out {
                prop_assert_eq!(r.final_reward, 0.0);
            } else {
                prop_assert_eq!(r.opted_out_contribution, 0.0);
                prop_assert!((r.final_reward - r.boosted_score * multiplier).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn prop_gated_display_is_zero(
        score in 0.0f64..1e9,
        rank in 201u32..100_000,
        is_boosted in any::<bool>(),
        entries in arb_leaderboard(20)
    ) {
        let engine = engine(5000.0);
        prop_assert_eq!(
            engine.calculate_user_reward(score, Some(rank), is_boosted, false, &entries),
            "$0"
        );
        prop_assert_eq!(
            engine.calculate_user_reward(score, Some(rank.min(200)), is_boosted, true, &entries),
            "$0"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_store_is_idempotent(entries in arb_leaderboard(60)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let engine = RewardsEngine::new(
                RewardsConfig::with_total_pool(5000.0),
                storage.clone(),
            )
            .unwrap();

            engine.store_opted_out_contributions(&entries).await.unwrap();
            let first = storage.len().await;
            engine.store_opted_out_contributions(&entries).await.unwrap();
            let second = storage.len().await;

            let opted_out: HashSet<String> = engine
                .calculate_rewards_with_optouts(&entries)
                .iter()
                .filter(|r| r.is_opted_out)
                .map(|r| r.participant_id.to_string())
                .collect();

            prop_assert_eq!(first, opted_out.len());
            prop_assert_eq!(second, first);
            Ok(())
        })?;
    }
}
