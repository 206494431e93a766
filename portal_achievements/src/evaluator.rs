use serde::Serialize;

use crate::tiers::{Tier, TierTable};

/// Outcome of evaluating one counter against one tier table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierEvaluation {
    /// Labels reached by the counter, in table order.
    pub unlocked: Vec<String>,
    /// Highest reached label, if any.
    pub current: Option<String>,
    /// First label whose threshold is above the counter.
    pub next: Option<String>,
    /// Distance to `next`; `0` when there is no next tier.
    pub remaining: u64,
}

/// Evaluates counters against a tier table injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierEvaluator {
    table: TierTable,
}

impl TierEvaluator {
    pub fn new(table: TierTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    pub fn evaluate(&self, counter: u64) -> TierEvaluation {
        let reached = self.table.reached(counter);
        let tiers = self.table.tiers();

        let unlocked = tiers[..reached]
            .iter()
            .map(|tier| tier.label.clone())
            .collect();
        let current = reached
            .checked_sub(1)
            .map(|index| tiers[index].label.clone());
        let next = self.table.get(reached);

        TierEvaluation {
            unlocked,
            current,
            next: next.map(|tier| tier.label.clone()),
            remaining: remaining_to(next, counter),
        }
    }

    /// Like [`TierEvaluator::evaluate`], but a counter below the lowest
    /// threshold sits on the lowest tier rather than before the table. The
    /// lowest tier becomes `current` and `next` is the tier after it, so the
    /// two never name the same tier.
    pub fn evaluate_from_floor(&self, counter: u64) -> TierEvaluation {
        let mut evaluation = self.evaluate(counter);
        if evaluation.current.is_none() {
            let next = self.table.get(1);
            evaluation.current = Some(self.table.first().label.clone());
            evaluation.next = next.map(|tier| tier.label.clone());
            evaluation.remaining = remaining_to(next, counter);
        }
        evaluation
    }
}

// A zero next threshold collapses to "nothing remaining", same as having no
// next tier at all.
fn remaining_to(next: Option<&Tier>, counter: u64) -> u64 {
    match next {
        Some(tier) if tier.threshold != 0 => tier.threshold.saturating_sub(counter),
        _ => 0,
    }
}
