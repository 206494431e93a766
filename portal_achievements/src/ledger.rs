use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = u64;
pub type CourseId = u64;
pub type LessonId = u64;

/// Failures reported by an activity ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("user {0} does not exist")]
    UnknownUser(UserId),
    #[error("lesson {0} does not exist")]
    UnknownLesson(LessonId),
    #[error("course {0} does not exist")]
    UnknownCourse(CourseId),
    #[error("user {user} is already enrolled in course {course}")]
    AlreadyEnrolled { user: UserId, course: CourseId },
    #[error("user {user} is not enrolled in course {course}")]
    NotEnrolled { user: UserId, course: CourseId },
    #[error("user {user} has already watched lesson {lesson}")]
    AlreadyWatched { user: UserId, lesson: LessonId },
    #[error("user {user} has already commented on lesson {lesson}")]
    AlreadyCommented { user: UserId, lesson: LessonId },
    #[error("lesson {lesson} already belongs to course {course}")]
    LessonInOtherCourse { lesson: LessonId, course: CourseId },
}

impl LedgerError {
    /// HTTP status a request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::UnknownUser(_)
            | LedgerError::UnknownLesson(_)
            | LedgerError::UnknownCourse(_) => 404,
            LedgerError::NotEnrolled { .. } => 403,
            LedgerError::AlreadyEnrolled { .. }
            | LedgerError::AlreadyWatched { .. }
            | LedgerError::AlreadyCommented { .. }
            | LedgerError::LessonInOtherCourse { .. } => 409,
        }
    }
}

/// Activity counters and the persisted achievement count the achievement
/// service reads from and writes back to.
pub trait ActivityLedger {
    fn lessons_watched(&self, user: UserId) -> Result<u64, LedgerError>;

    fn comments_written(&self, user: UserId) -> Result<u64, LedgerError>;

    fn achievement_count(&self, user: UserId) -> Result<u64, LedgerError>;

    fn store_achievement_count(&mut self, user: UserId, count: u64) -> Result<(), LedgerError>;

    fn enroll(&mut self, user: UserId, course: CourseId) -> Result<(), LedgerError>;

    /// Records a watched lesson. The user must be enrolled in the lesson's
    /// course and may watch each lesson once.
    fn record_lesson_watched(&mut self, user: UserId, lesson: LessonId)
        -> Result<(), LedgerError>;

    /// Records a comment. Same enrollment rule as watching; one comment per
    /// user per lesson.
    fn record_comment(&mut self, user: UserId, lesson: LessonId) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub name: String,
    #[serde(default)]
    pub courses: BTreeSet<CourseId>,
    #[serde(default)]
    pub watched_lessons: BTreeSet<LessonId>,
    #[serde(default)]
    pub commented_lessons: BTreeSet<LessonId>,
    #[serde(default)]
    pub achievements_count: u64,
}

impl UserActivity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Inconsistencies found in a ledger file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("lesson {lesson} belongs to unknown course {course}")]
    LessonCourseMissing { lesson: LessonId, course: CourseId },
    #[error("user {user} is enrolled in unknown course {course}")]
    EnrolledCourseMissing { user: UserId, course: CourseId },
    #[error("user {user} has activity on unknown lesson {lesson}")]
    ActivityLessonMissing { user: UserId, lesson: LessonId },
    #[error("user {user} has activity on lesson {lesson} outside enrolled course {course}")]
    ActivityNotEnrolled {
        user: UserId,
        lesson: LessonId,
        course: CourseId,
    },
}

/// Ledger contents. Deserializing checks that every lesson, enrollment and
/// recorded activity points at something the ledger knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
struct LedgerSnapshot {
    courses: BTreeSet<CourseId>,
    /// Lesson id to owning course id.
    lessons: BTreeMap<LessonId, CourseId>,
    users: BTreeMap<UserId, UserActivity>,
}

#[derive(Deserialize)]
struct SnapshotRecord {
    #[serde(default)]
    courses: BTreeSet<CourseId>,
    #[serde(default)]
    lessons: BTreeMap<LessonId, CourseId>,
    #[serde(default)]
    users: BTreeMap<UserId, UserActivity>,
}

impl TryFrom<SnapshotRecord> for LedgerSnapshot {
    type Error = SnapshotError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let snapshot = LedgerSnapshot {
            courses: record.courses,
            lessons: record.lessons,
            users: record.users,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl LedgerSnapshot {
    fn validate(&self) -> Result<(), SnapshotError> {
        for (&lesson, &course) in &self.lessons {
            if !self.courses.contains(&course) {
                return Err(SnapshotError::LessonCourseMissing { lesson, course });
            }
        }

        for (&user, activity) in &self.users {
            if let Some(&course) = activity.courses.difference(&self.courses).next() {
                return Err(SnapshotError::EnrolledCourseMissing { user, course });
            }
            for &lesson in activity
                .watched_lessons
                .iter()
                .chain(&activity.commented_lessons)
            {
                let Some(&course) = self.lessons.get(&lesson) else {
                    return Err(SnapshotError::ActivityLessonMissing { user, lesson });
                };
                if !activity.courses.contains(&course) {
                    return Err(SnapshotError::ActivityNotEnrolled {
                        user,
                        lesson,
                        course,
                    });
                }
            }
        }
        Ok(())
    }
}

/// In-memory ledger that can be loaded from and saved to a JSON file.
#[derive(Debug, Default, Clone)]
pub struct JsonLedger {
    snapshot: LedgerSnapshot,
    dirty: bool,
    backing_path: Option<PathBuf>,
}

impl JsonLedger {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let mut ledger = JsonLedger {
            snapshot: LedgerSnapshot::default(),
            dirty: false,
            backing_path: path.map(|p| p.to_path_buf()),
        };
        if let Some(p) = path {
            if p.exists() {
                let raw = fs::read_to_string(p)
                    .with_context(|| format!("failed to read ledger file: {}", p.display()))?;
                ledger.snapshot = serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse ledger json: {}", p.display()))?;
            }
        }
        Ok(ledger)
    }

    pub fn add_course(&mut self, course: CourseId) {
        if self.snapshot.courses.insert(course) {
            self.dirty = true;
        }
    }

    pub fn add_lesson(&mut self, lesson: LessonId, course: CourseId) -> Result<(), LedgerError> {
        if !self.snapshot.courses.contains(&course) {
            return Err(LedgerError::UnknownCourse(course));
        }
        match self.snapshot.lessons.get(&lesson) {
            Some(&existing) if existing == course => {}
            Some(&existing) => {
                return Err(LedgerError::LessonInOtherCourse {
                    lesson,
                    course: existing,
                })
            }
            None => {
                self.snapshot.lessons.insert(lesson, course);
                self.dirty = true;
            }
        }
        Ok(())
    }

    pub fn add_user(&mut self, user: UserId, name: impl Into<String>) {
        let name = name.into();
        match self.snapshot.users.get_mut(&user) {
            Some(existing) if existing.name == name => {}
            Some(existing) => {
                existing.name = name;
                self.dirty = true;
            }
            None => {
                self.snapshot.users.insert(user, UserActivity::new(name));
                self.dirty = true;
            }
        }
    }

    pub fn user(&self, user: UserId) -> Option<&UserActivity> {
        self.snapshot.users.get(&user)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_backing_path(&mut self, path: PathBuf) {
        self.backing_path = Some(path);
    }

    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.backing_path.as_ref() else {
            // Purely in-memory ledgers have nothing to flush.
            self.dirty = false;
            return Ok(());
        };

        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create ledger directory: {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(&self.snapshot)
            .with_context(|| format!("failed to serialize ledger to JSON: {}", path.display()))?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write ledger file: {}", path.display()))?;
        log::info!(
            "saved ledger with {} users to {}",
            self.snapshot.users.len(),
            path.display()
        );
        self.dirty = false;
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let mut snapshot = self.clone();
        snapshot.set_backing_path(path.to_path_buf());
        snapshot.dirty = true;
        snapshot.save()
    }

    fn activity(&self, user: UserId) -> Result<&UserActivity, LedgerError> {
        self.snapshot
            .users
            .get(&user)
            .ok_or(LedgerError::UnknownUser(user))
    }

    fn activity_mut(&mut self, user: UserId) -> Result<&mut UserActivity, LedgerError> {
        self.snapshot
            .users
            .get_mut(&user)
            .ok_or(LedgerError::UnknownUser(user))
    }

    fn enrolled_activity_mut(
        &mut self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<&mut UserActivity, LedgerError> {
        let course = *self
            .snapshot
            .lessons
            .get(&lesson)
            .ok_or(LedgerError::UnknownLesson(lesson))?;
        let activity = self.activity_mut(user)?;
        if !activity.courses.contains(&course) {
            return Err(LedgerError::NotEnrolled { user, course });
        }
        Ok(activity)
    }
}

impl ActivityLedger for JsonLedger {
    fn lessons_watched(&self, user: UserId) -> Result<u64, LedgerError> {
        Ok(self.activity(user)?.watched_lessons.len() as u64)
    }

    fn comments_written(&self, user: UserId) -> Result<u64, LedgerError> {
        Ok(self.activity(user)?.commented_lessons.len() as u64)
    }

    fn achievement_count(&self, user: UserId) -> Result<u64, LedgerError> {
        Ok(self.activity(user)?.achievements_count)
    }

    fn store_achievement_count(&mut self, user: UserId, count: u64) -> Result<(), LedgerError> {
        let activity = self.activity_mut(user)?;
        if activity.achievements_count != count {
            activity.achievements_count = count;
            self.dirty = true;
        }
        Ok(())
    }

    fn enroll(&mut self, user: UserId, course: CourseId) -> Result<(), LedgerError> {
        if !self.snapshot.courses.contains(&course) {
            return Err(LedgerError::UnknownCourse(course));
        }
        let activity = self.activity_mut(user)?;
        if !activity.courses.insert(course) {
            return Err(LedgerError::AlreadyEnrolled { user, course });
        }
        self.dirty = true;
        Ok(())
    }

    fn record_lesson_watched(
        &mut self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<(), LedgerError> {
        let activity = self.enrolled_activity_mut(user, lesson)?;
        if !activity.watched_lessons.insert(lesson) {
            return Err(LedgerError::AlreadyWatched { user, lesson });
        }
        self.dirty = true;
        Ok(())
    }

    fn record_comment(&mut self, user: UserId, lesson: LessonId) -> Result<(), LedgerError> {
        let activity = self.enrolled_activity_mut(user, lesson)?;
        if !activity.commented_lessons.insert(lesson) {
            return Err(LedgerError::AlreadyCommented { user, lesson });
        }
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> JsonLedger {
        let mut ledger = JsonLedger::default();
        ledger.add_course(1);
        ledger.add_course(2);
        ledger.add_lesson(10, 1).unwrap();
        ledger.add_lesson(11, 1).unwrap();
        ledger.add_lesson(20, 2).unwrap();
        ledger.add_user(7, "ada");
        ledger
    }

    #[test]
    fn watching_requires_enrollment() {
        let mut ledger = seeded();
        assert_eq!(
            ledger.record_lesson_watched(7, 10),
            Err(LedgerError::NotEnrolled { user: 7, course: 1 })
        );

        ledger.enroll(7, 1).unwrap();
        ledger.record_lesson_watched(7, 10).unwrap();
        ledger.record_lesson_watched(7, 11).unwrap();
        assert_eq!(ledger.lessons_watched(7), Ok(2));

        assert_eq!(
            ledger.record_lesson_watched(7, 20),
            Err(LedgerError::NotEnrolled { user: 7, course: 2 })
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut ledger = seeded();
        ledger.enroll(7, 1).unwrap();
        assert_eq!(
            ledger.enroll(7, 1),
            Err(LedgerError::AlreadyEnrolled { user: 7, course: 1 })
        );

        ledger.record_lesson_watched(7, 10).unwrap();
        let err = ledger.record_lesson_watched(7, 10).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyWatched { user: 7, lesson: 10 });
        assert_eq!(err.status_code(), 409);

        ledger.record_comment(7, 10).unwrap();
        assert_eq!(
            ledger.record_comment(7, 10),
            Err(LedgerError::AlreadyCommented { user: 7, lesson: 10 })
        );
        assert_eq!(ledger.comments_written(7), Ok(1));
    }

    #[test]
    fn unknown_entities_map_to_not_found() {
        let mut ledger = seeded();
        assert_eq!(ledger.lessons_watched(99), Err(LedgerError::UnknownUser(99)));
        assert_eq!(ledger.enroll(7, 5), Err(LedgerError::UnknownCourse(5)));
        assert_eq!(ledger.add_lesson(30, 5), Err(LedgerError::UnknownCourse(5)));
        assert_eq!(
            ledger.add_lesson(10, 2),
            Err(LedgerError::LessonInOtherCourse { lesson: 10, course: 1 })
        );
        assert_eq!(ledger.add_lesson(10, 1), Ok(()));
        let err = ledger.record_comment(7, 42).unwrap_err();
        assert_eq!(err, LedgerError::UnknownLesson(42));
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            LedgerError::NotEnrolled { user: 1, course: 1 }.status_code(),
            403
        );
    }

    #[test]
    fn storing_same_count_keeps_ledger_clean() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ledger.json");
        let mut ledger = seeded();
        ledger.set_backing_path(path.clone());
        ledger.save()?;
        assert!(!ledger.is_dirty());

        ledger.store_achievement_count(7, 0)?;
        assert!(!ledger.is_dirty());
        ledger.store_achievement_count(7, 3)?;
        assert!(ledger.is_dirty());
        assert_eq!(ledger.achievement_count(7)?, 3);
        Ok(())
    }

    #[test]
    fn ledger_roundtrip_preserves_activity() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("ledger.json");

        let mut ledger = seeded();
        ledger.enroll(7, 1)?;
        ledger.record_lesson_watched(7, 10)?;
        ledger.record_comment(7, 11)?;
        ledger.store_achievement_count(7, 2)?;
        ledger.set_backing_path(path.clone());
        ledger.save()?;

        let snapshot_path = dir.path().join("snapshot.json");
        ledger.save_to_path(&snapshot_path)?;
        assert!(snapshot_path.is_file());

        let reloaded = JsonLedger::from_json_file(Some(&path))?;
        let user = reloaded.user(7).expect("user survives reload");
        assert_eq!(user.name, "ada");
        assert!(user.courses.contains(&1));
        assert!(user.watched_lessons.contains(&10));
        assert!(user.commented_lessons.contains(&11));
        assert_eq!(reloaded.achievement_count(7)?, 2);
        assert!(!reloaded.is_dirty());
        Ok(())
    }

    #[test]
    fn inconsistent_files_are_rejected() -> Result<()> {
        let cases = [
            (
                r#"{ "courses": [1], "lessons": { "10": 2 } }"#,
                "lesson 10 belongs to unknown course 2",
            ),
            (
                r#"{ "courses": [1], "users": { "7": { "name": "ada", "courses": [3] } } }"#,
                "user 7 is enrolled in unknown course 3",
            ),
            (
                r#"{ "courses": [1], "lessons": { "10": 1 },
                     "users": { "7": { "name": "ada", "courses": [1], "watched_lessons": [11] } } }"#,
                "user 7 has activity on unknown lesson 11",
            ),
            (
                r#"{ "courses": [1, 2], "lessons": { "10": 1, "20": 2 },
                     "users": { "7": { "name": "ada", "courses": [1], "commented_lessons": [20] } } }"#,
                "outside enrolled course 2",
            ),
        ];

        let dir = tempdir()?;
        for (index, (json, expected)) in cases.iter().enumerate() {
            let path = dir.path().join(format!("ledger_{index}.json"));
            fs::write(&path, json)?;
            let err = JsonLedger::from_json_file(Some(&path)).unwrap_err();
            let message = format!("{err:#}");
            assert!(message.contains("failed to parse ledger json"), "{message}");
            assert!(message.contains(expected), "{message}");
        }
        Ok(())
    }

    #[test]
    fn saved_ledger_passes_validation() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ledger.json");
        let mut ledger = seeded();
        ledger.enroll(7, 2)?;
        ledger.record_comment(7, 20)?;
        ledger.save_to_path(&path)?;

        let reloaded = JsonLedger::from_json_file(Some(&path))?;
        assert_eq!(reloaded.comments_written(7)?, 1);
        Ok(())
    }

    #[test]
    fn missing_file_starts_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fresh.json");
        let ledger = JsonLedger::from_json_file(Some(&path))?;
        assert!(ledger.user(1).is_none());
        Ok(())
    }
}
