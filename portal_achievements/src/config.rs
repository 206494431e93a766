use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregator::AchievementAggregator;
use crate::badge::BadgeEvaluator;
use crate::tiers::TierTable;

/// The three tier tables the portal evaluates against.
///
/// Any table missing from a configuration file keeps its built-in value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub lessons_watched: TierTable,
    pub comments_written: TierTable,
    pub badges: TierTable,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            lessons_watched: TierTable::lessons_watched(),
            comments_written: TierTable::comments_written(),
            badges: TierTable::badges(),
        }
    }
}

impl TierConfig {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read tier config: {}", path.display()))?;
        let config: TierConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse tier config: {}", path.display()))?;
        log::debug!(
            "loaded tier config from {} ({} lesson tiers, {} comment tiers, {} badges)",
            path.display(),
            config.lessons_watched.len(),
            config.comments_written.len(),
            config.badges.len()
        );
        Ok(config)
    }

    pub fn aggregator(&self) -> AchievementAggregator {
        AchievementAggregator::new(self.lessons_watched.clone(), self.comments_written.clone())
    }

    pub fn badge_evaluator(&self) -> BadgeEvaluator {
        BadgeEvaluator::new(self.badges.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn missing_path_yields_built_in_tables() -> Result<()> {
        let config = TierConfig::from_json_file(None)?;
        assert_eq!(config, TierConfig::default());
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_named_tables() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "badges": [
                {{ "label": "Newcomer", "threshold": 0 }},
                {{ "label": "Regular", "threshold": 2 }}
            ] }}"#
        )?;

        let config = TierConfig::from_json_file(Some(file.path()))?;
        assert_eq!(config.lessons_watched, TierTable::lessons_watched());
        assert_eq!(config.comments_written, TierTable::comments_written());

        let status = config.badge_evaluator().evaluate(1);
        assert_eq!(status.current_badge, "Newcomer");
        assert_eq!(status.next_badge, "Regular");
        assert_eq!(status.remaining_to_unlock_next_badge, 1);
        Ok(())
    }

    #[test]
    fn invalid_table_aborts_loading() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "lessons_watched": [
                {{ "label": "One", "threshold": 1 }},
                {{ "label": "Also One", "threshold": 1 }}
            ] }}"#
        )?;

        let err = TierConfig::from_json_file(Some(file.path())).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("failed to parse tier config"), "{message}");
        assert!(message.contains("does not exceed"), "{message}");
        Ok(())
    }

    #[test]
    fn unreadable_path_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = TierConfig::from_json_file(Some(&missing)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read tier config"));
    }
}
