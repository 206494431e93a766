use serde::Serialize;

use crate::evaluator::TierEvaluator;
use crate::tiers::TierTable;

/// Achievements unlocked across both activity dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementSummary {
    /// Lessons labels first, then comments labels.
    #[serde(rename = "unlocked_achievements")]
    pub unlocked: Vec<String>,
    /// At most one label per dimension, lessons first.
    #[serde(rename = "next_available_achievements")]
    pub next_available: Vec<String>,
    #[serde(skip)]
    pub total_unlocked: u64,
}

/// Runs the lessons-watched and comments-written tier passes and merges them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementAggregator {
    lessons: TierEvaluator,
    comments: TierEvaluator,
}

impl Default for AchievementAggregator {
    fn default() -> Self {
        Self::new(TierTable::lessons_watched(), TierTable::comments_written())
    }
}

impl AchievementAggregator {
    pub fn new(lessons: TierTable, comments: TierTable) -> Self {
        Self {
            lessons: TierEvaluator::new(lessons),
            comments: TierEvaluator::new(comments),
        }
    }

    pub fn lessons(&self) -> &TierEvaluator {
        &self.lessons
    }

    pub fn comments(&self) -> &TierEvaluator {
        &self.comments
    }

    pub fn compute(&self, lessons_watched: u64, comments_written: u64) -> AchievementSummary {
        let mut unlocked = Vec::new();
        let mut next_available = Vec::new();

        for (evaluator, counter) in [
            (&self.lessons, lessons_watched),
            (&self.comments, comments_written),
        ] {
            let evaluation = evaluator.evaluate_from_floor(counter);
            unlocked.extend(evaluation.unlocked);

            // An idle dimension always advertises its first tier, even when
            // that tier's threshold is zero and it already counts as unlocked.
            // Any other counter below the first threshold sits on that tier,
            // so the tier after it is next.
            let next = if counter == 0 {
                Some(evaluator.table().first().label.clone())
            } else {
                evaluation.next
            };
            next_available.extend(next);
        }

        let total_unlocked = unlocked.len() as u64;
        AchievementSummary {
            unlocked,
            next_available,
            total_unlocked,
        }
    }
}
