use crate::types::BoostedEntry;

/// Eligible entries split by opt-out decision. Each entry is in exactly one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cohorts {
    pub active: Vec<BoostedEntry>,
    pub opted_out: Vec<BoostedEntry>,
}

impl Cohorts {
    pub fn sum_active(&self) -> f64 {
        self.active.iter().map(|e| e.boosted_score).sum()
    }

    pub fn sum_opted_out(&self) -> f64 {
        self.opted_out.iter().map(|e| e.boosted_score).sum()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.opted_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.opted_out.is_empty()
    }
}

pub struct CohortPartitioner;

impl CohortPartitioner {
    /// Stable split on `is_opted_out`. Callers filter out ineligible ranks first.
    pub fn partition(entries: Vec<BoostedEntry>) -> Cohorts {
        let (opted_out, active) = entries.into_iter().partition(|e| e.is_opted_out());
        Cohorts { active, opted_out }
    }
}
