use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use portal_achievements::{CourseId, LessonId, UserId};

#[derive(Parser, Debug)]
#[command(
    about = "Computes learning-portal achievements and badges from activity counters",
    version
)]
pub struct Args {
    /// Optional JSON file overriding the lessons/comments/badge tier tables
    #[arg(long)]
    pub tiers: Option<PathBuf>,

    /// Number of lessons watched (direct evaluation)
    #[arg(long)]
    pub lessons: Option<u64>,

    /// Number of comments written (direct evaluation)
    #[arg(long)]
    pub comments: Option<u64>,

    /// Achievement count to evaluate the badge for (defaults to the computed total)
    #[arg(long)]
    pub badge_count: Option<u64>,

    /// JSON ledger file holding users, courses and recorded activity
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// User to evaluate (requires --ledger)
    #[arg(long)]
    pub user: Option<UserId>,

    /// Register the user under this name, or rename it (requires --ledger)
    #[arg(long)]
    pub name: Option<String>,

    /// Register a course in the ledger; repeatable (requires --ledger)
    #[arg(long, value_name = "COURSE")]
    pub add_course: Vec<CourseId>,

    /// Register a lesson under a course as LESSON:COURSE; repeatable (requires --ledger)
    #[arg(long, value_name = "LESSON:COURSE", value_parser = parse_lesson_course)]
    pub add_lesson: Vec<(LessonId, CourseId)>,

    /// Enroll the user in this course before evaluating (requires --ledger)
    #[arg(long, value_name = "COURSE")]
    pub enroll: Option<CourseId>,

    /// Record this lesson as watched before evaluating (requires --ledger)
    #[arg(long, value_name = "LESSON")]
    pub watch_lesson: Option<LessonId>,

    /// Record a comment on this lesson before evaluating (requires --ledger)
    #[arg(long, value_name = "LESSON")]
    pub comment_lesson: Option<LessonId>,

    /// Path to write the achievements and badge as JSON
    #[arg(long)]
    pub json_report: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Command {
    Evaluate(EvaluateArgs),
    Ledger(LedgerArgs),
}

#[derive(Debug)]
pub struct EvaluateArgs {
    pub tiers: Option<PathBuf>,
    pub lessons: u64,
    pub comments: u64,
    pub badge_count: Option<u64>,
    pub json_report: Option<PathBuf>,
}

#[derive(Debug)]
pub struct LedgerArgs {
    pub tiers: Option<PathBuf>,
    pub ledger: PathBuf,
    pub user: UserId,
    pub name: Option<String>,
    pub add_course: Vec<CourseId>,
    pub add_lesson: Vec<(LessonId, CourseId)>,
    pub enroll: Option<CourseId>,
    pub watch_lesson: Option<LessonId>,
    pub comment_lesson: Option<LessonId>,
    pub json_report: Option<PathBuf>,
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

impl Args {
    pub fn into_command(self) -> Result<Command> {
        let has_activity =
            self.enroll.is_some() || self.watch_lesson.is_some() || self.comment_lesson.is_some();
        let has_seeding =
            self.name.is_some() || !self.add_course.is_empty() || !self.add_lesson.is_empty();

        match self.ledger {
            Some(ledger) => {
                if self.lessons.is_some() || self.comments.is_some() || self.badge_count.is_some() {
                    bail!("--lessons/--comments/--badge-count cannot be combined with --ledger");
                }
                let Some(user) = self.user else {
                    bail!("--ledger requires --user");
                };
                Ok(Command::Ledger(LedgerArgs {
                    tiers: self.tiers,
                    ledger,
                    user,
                    name: self.name,
                    add_course: self.add_course,
                    add_lesson: self.add_lesson,
                    enroll: self.enroll,
                    watch_lesson: self.watch_lesson,
                    comment_lesson: self.comment_lesson,
                    json_report: self.json_report,
                }))
            }
            None => {
                if self.user.is_some() {
                    bail!("--user requires --ledger");
                }
                if has_activity {
                    bail!("--enroll/--watch-lesson/--comment-lesson require --ledger");
                }
                if has_seeding {
                    bail!("--name/--add-course/--add-lesson require --ledger");
                }
                Ok(Command::Evaluate(EvaluateArgs {
                    tiers: self.tiers,
                    lessons: self.lessons.unwrap_or(0),
                    comments: self.comments.unwrap_or(0),
                    badge_count: self.badge_count,
                    json_report: self.json_report,
                }))
            }
        }
    }
}

fn parse_lesson_course(raw: &str) -> Result<(LessonId, CourseId)> {
    let Some((lesson, course)) = raw.split_once(':') else {
        bail!("expected LESSON:COURSE, got {raw:?}");
    };
    let lesson: LessonId = lesson
        .trim()
        .parse()
        .with_context(|| format!("invalid lesson id in {raw:?}"))?;
    let course: CourseId = course
        .trim()
        .parse()
        .with_context(|| format!("invalid course id in {raw:?}"))?;
    Ok((lesson, course))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Result<Command> {
        let mut argv = vec!["portal_cli"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv)?.into_command()
    }

    #[test]
    fn counters_default_to_zero() {
        let Command::Evaluate(args) = parse_from(&["--lessons", "4"]).unwrap() else {
            panic!("expected direct evaluation");
        };
        assert_eq!(args.lessons, 4);
        assert_eq!(args.comments, 0);
        assert_eq!(args.badge_count, None);
    }

    #[test]
    fn ledger_mode_needs_user() {
        let err = parse_from(&["--ledger", "ledger.json"]).unwrap_err();
        assert!(err.to_string().contains("--user"));

        let Command::Ledger(args) =
            parse_from(&["--ledger", "ledger.json", "--user", "3", "--watch-lesson", "9"])
                .unwrap()
        else {
            panic!("expected ledger mode");
        };
        assert_eq!(args.user, 3);
        assert_eq!(args.watch_lesson, Some(9));
    }

    #[test]
    fn seeding_flags_collect_in_order() {
        let Command::Ledger(args) = parse_from(&[
            "--ledger",
            "ledger.json",
            "--user",
            "7",
            "--name",
            "ada",
            "--add-course",
            "1",
            "--add-course",
            "2",
            "--add-lesson",
            "10:1",
            "--add-lesson",
            "20:2",
        ])
        .unwrap() else {
            panic!("expected ledger mode");
        };
        assert_eq!(args.name.as_deref(), Some("ada"));
        assert_eq!(args.add_course, vec![1, 2]);
        assert_eq!(args.add_lesson, vec![(10, 1), (20, 2)]);
    }

    #[test]
    fn lesson_course_pairs_are_validated() {
        assert_eq!(parse_lesson_course("10:1").unwrap(), (10, 1));
        assert!(parse_lesson_course("10").is_err());
        assert!(parse_lesson_course("x:1").is_err());
        assert!(parse_from(&["--add-course", "1"]).is_err());
    }

    #[test]
    fn mixed_modes_are_rejected() {
        assert!(parse_from(&["--ledger", "l.json", "--user", "1", "--lessons", "2"]).is_err());
        assert!(parse_from(&["--comment-lesson", "2"]).is_err());
        assert!(parse_from(&["--user", "1"]).is_err());
    }
}
