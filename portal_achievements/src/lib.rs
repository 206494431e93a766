//! Achievement and badge computation for the learning portal.
//!
//! Lessons watched and comments written are mapped onto ordered tier tables;
//! the number of unlocked achievements in turn selects a badge tier. The
//! evaluators are pure. User activity and the persisted achievement count live
//! behind [`ActivityLedger`].

pub mod aggregator;
pub mod badge;
pub mod config;
pub mod evaluator;
pub mod ledger;
pub mod service;
pub mod tiers;

pub use aggregator::{AchievementAggregator, AchievementSummary};
pub use badge::{BadgeEvaluator, BadgeStatus};
pub use config::TierConfig;
pub use evaluator::{TierEvaluation, TierEvaluator};
pub use ledger::{
    ActivityLedger, CourseId, JsonLedger, LedgerError, LessonId, SnapshotError, UserActivity,
    UserId,
};
pub use service::AchievementService;
pub use tiers::{Tier, TierTable, TierTableError};
