use serde::{Deserialize, Serialize};

use crate::evaluator::TierEvaluator;
use crate::tiers::TierTable;

/// Badge standing for a user, shaped like the badge endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeStatus {
    pub current_badge: String,
    /// Empty when the top badge is held.
    pub next_badge: String,
    pub remaining_to_unlock_next_badge: u64,
}

impl BadgeStatus {
    pub fn is_top_tier(&self) -> bool {
        self.next_badge.is_empty()
    }
}

/// Maps a total unlocked-achievement count onto badge tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeEvaluator {
    evaluator: TierEvaluator,
}

impl Default for BadgeEvaluator {
    fn default() -> Self {
        Self::new(TierTable::badges())
    }
}

impl BadgeEvaluator {
    pub fn new(table: TierTable) -> Self {
        Self {
            evaluator: TierEvaluator::new(table),
        }
    }

    pub fn table(&self) -> &TierTable {
        self.evaluator.table()
    }

    pub fn evaluate(&self, achievement_count: u64) -> BadgeStatus {
        let evaluation = self.evaluator.evaluate_from_floor(achievement_count);
        BadgeStatus {
            current_badge: evaluation.current.unwrap_or_default(),
            next_badge: evaluation.next.unwrap_or_default(),
            remaining_to_unlock_next_badge: evaluation.remaining,
        }
    }
}
