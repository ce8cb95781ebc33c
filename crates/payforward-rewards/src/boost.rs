use crate::types::{BoostedEntry, RankedEntry};
use tracing::warn;

/// Multiplier for participants holding the qualifying token balance.
pub const DEFAULT_BOOST_FACTOR: f64 = 1.1;

/// Applies the boost factor to qualifying participants. The same resolver is
/// used for reward and contribution math so both see identical scores.
#[derive(Debug, Clone, Copy)]
pub struct BoostedScoreResolver {
    boost_factor: f64,
}

impl Default for BoostedScoreResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BOOST_FACTOR)
    }
}

impl BoostedScoreResolver {
    pub fn new(boost_factor: f64) -> Self {
        Self { boost_factor }
    }

    pub fn boost_factor(&self) -> f64 {
        self.boost_factor
    }

    /// Boosted score for a finite raw score. Saturates at `f64::MAX` rather
    /// than overflowing to infinity.
    pub fn resolve_score(&self, raw_score: f64, is_boosted: bool) -> f64 {
        if !is_boosted {
            return raw_score;
        }
        let boosted = raw_score * self.boost_factor;
        if boosted == f64::INFINITY && raw_score.is_finite() {
            f64::MAX
        } else {
            boosted
        }
    }

    pub fn resolve(&self, entry: &RankedEntry) -> f64 {
        self.resolve_score(entry.raw_score, entry.is_boosted)
    }

    pub fn boost(&self, entry: RankedEntry) -> BoostedEntry {
        let boosted_score = self.resolve(&entry);
        if boosted_score == f64::MAX && entry.raw_score < f64::MAX {
            warn!(
                participant = %entry.participant_id,
                raw_score = entry.raw_score,
                "⚠️ Boosted score saturated at f64::MAX"
            );
        }
        BoostedEntry {
            entry,
            boosted_score,
            position: 0,
        }
    }
}
