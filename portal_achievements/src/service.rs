use crate::aggregator::{AchievementAggregator, AchievementSummary};
use crate::badge::{BadgeEvaluator, BadgeStatus};
use crate::config::TierConfig;
use crate::ledger::{ActivityLedger, CourseId, LedgerError, LessonId, UserId};

/// Couples the achievement evaluators with the ledger that owns user activity.
///
/// Evaluation itself never fails; every error surfaced here comes from the
/// ledger.
pub struct AchievementService<L> {
    ledger: L,
    aggregator: AchievementAggregator,
    badges: BadgeEvaluator,
}

impl<L: ActivityLedger> AchievementService<L> {
    pub fn new(ledger: L, aggregator: AchievementAggregator, badges: BadgeEvaluator) -> Self {
        Self {
            ledger,
            aggregator,
            badges,
        }
    }

    pub fn with_config(ledger: L, config: &TierConfig) -> Self {
        Self::new(ledger, config.aggregator(), config.badge_evaluator())
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Recomputes a user's achievements from the ledger counters and persists
    /// the unlocked total.
    pub fn refresh_achievements(&mut self, user: UserId) -> Result<AchievementSummary, LedgerError> {
        let lessons = self.ledger.lessons_watched(user)?;
        let comments = self.ledger.comments_written(user)?;
        let summary = self.aggregator.compute(lessons, comments);
        log::debug!(
            "user {user}: lessons={lessons} comments={comments} -> {} unlocked, next {:?}",
            summary.total_unlocked,
            summary.next_available
        );
        self.ledger
            .store_achievement_count(user, summary.total_unlocked)?;
        Ok(summary)
    }

    /// Badge for the achievement count last persisted for `user`.
    pub fn user_badge(&self, user: UserId) -> Result<BadgeStatus, LedgerError> {
        let count = self.ledger.achievement_count(user)?;
        Ok(self.badges.evaluate(count))
    }

    pub fn enroll(&mut self, user: UserId, course: CourseId) -> Result<(), LedgerError> {
        self.ledger
            .enroll(user, course)
            .inspect_err(|err| log::warn!("enrollment rejected: {err}"))
    }

    pub fn watch_lesson(
        &mut self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<AchievementSummary, LedgerError> {
        self.ledger
            .record_lesson_watched(user, lesson)
            .inspect_err(|err| log::warn!("lesson view rejected: {err}"))?;
        self.refresh_achievements(user)
    }

    pub fn write_comment(
        &mut self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<AchievementSummary, LedgerError> {
        self.ledger
            .record_comment(user, lesson)
            .inspect_err(|err| log::warn!("comment rejected: {err}"))?;
        self.refresh_achievements(user)
    }
}
