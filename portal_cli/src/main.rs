use std::{fs, path::Path};

use anyhow::{Context, Result};
use portal_achievements::{
    AchievementService, AchievementSummary, BadgeStatus, JsonLedger, TierConfig,
};
use serde::Serialize;

mod cli;
use cli::{Command, EvaluateArgs, LedgerArgs};

#[derive(Serialize)]
struct PortalReport<'a> {
    achievements: &'a AchievementSummary,
    badge: &'a BadgeStatus,
}

fn main() -> Result<()> {
    env_logger::init();

    match cli::parse()? {
        Command::Evaluate(args) => run_evaluate(args),
        Command::Ledger(args) => run_ledger(args),
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let config =
        TierConfig::from_json_file(args.tiers.as_deref()).context("loading tier tables")?;
    let summary = config.aggregator().compute(args.lessons, args.comments);
    let badge_count = args.badge_count.unwrap_or(summary.total_unlocked);
    let badge = config.badge_evaluator().evaluate(badge_count);

    println!(
        "Activity -> lessons watched: {} | comments written: {}",
        args.lessons, args.comments
    );
    describe(&summary, &badge, badge_count);

    if let Some(path) = args.json_report.as_deref() {
        write_report(path, &summary, &badge)?;
    }
    Ok(())
}

fn run_ledger(args: LedgerArgs) -> Result<()> {
    let config =
        TierConfig::from_json_file(args.tiers.as_deref()).context("loading tier tables")?;
    let ledger = JsonLedger::from_json_file(Some(&args.ledger)).context("loading ledger")?;
    log::debug!("loaded ledger from {}", args.ledger.display());
    let mut service = AchievementService::with_config(ledger, &config);
    let user = args.user;

    {
        let ledger = service.ledger_mut();
        for &course in &args.add_course {
            ledger.add_course(course);
        }
        for &(lesson, course) in &args.add_lesson {
            ledger
                .add_lesson(lesson, course)
                .with_context(|| format!("registering lesson {lesson} under course {course}"))?;
        }
        if let Some(name) = args.name.as_deref() {
            ledger.add_user(user, name);
        }
    }

    if let Some(course) = args.enroll {
        match service.enroll(user, course) {
            Ok(()) => println!("Enrolled user {user} in course {course}"),
            Err(err) => eprintln!("[portal_cli] enroll failed ({}): {err}", err.status_code()),
        }
    }
    if let Some(lesson) = args.watch_lesson {
        match service.watch_lesson(user, lesson) {
            Ok(_) => println!("Recorded lesson {lesson} as watched by user {user}"),
            Err(err) => eprintln!("[portal_cli] watch failed ({}): {err}", err.status_code()),
        }
    }
    if let Some(lesson) = args.comment_lesson {
        match service.write_comment(user, lesson) {
            Ok(_) => println!("Recorded comment on lesson {lesson} by user {user}"),
            Err(err) => eprintln!("[portal_cli] comment failed ({}): {err}", err.status_code()),
        }
    }

    let summary = service
        .refresh_achievements(user)
        .with_context(|| format!("refreshing achievements for user {user}"))?;
    let badge = service
        .user_badge(user)
        .with_context(|| format!("evaluating badge for user {user}"))?;

    if let Some(activity) = service.ledger().user(user) {
        println!(
            "User {user} ({}) -> lessons watched: {} | comments written: {}",
            activity.name,
            activity.watched_lessons.len(),
            activity.commented_lessons.len()
        );
    }
    describe(&summary, &badge, summary.total_unlocked);

    let mut ledger = service.into_ledger();
    ledger.save()?;

    if let Some(path) = args.json_report.as_deref() {
        write_report(path, &summary, &badge)?;
    }
    Ok(())
}

fn describe(summary: &AchievementSummary, badge: &BadgeStatus, badge_count: u64) {
    println!("\nUnlocked achievements ({}):", summary.total_unlocked);
    if summary.unlocked.is_empty() {
        println!("  (none yet)");
    }
    for label in &summary.unlocked {
        println!("  - {label}");
    }

    if !summary.next_available.is_empty() {
        println!("\nNext available:");
        for label in &summary.next_available {
            println!("  - {label}");
        }
    }

    println!("\nBadge (from {badge_count} achievements): {}", badge.current_badge);
    if badge.is_top_tier() {
        println!("  top badge reached");
    } else {
        println!(
            "  next: {} ({} to go)",
            badge.next_badge, badge.remaining_to_unlock_next_badge
        );
    }
}

fn write_report(path: &Path, summary: &AchievementSummary, badge: &BadgeStatus) -> Result<()> {
    let report = PortalReport {
        achievements: summary,
        badge,
    };
    let json =
        serde_json::to_string_pretty(&report).context("serializing portal report to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing portal report to {}", path.display()))?;
    println!("\nSaved portal report JSON to {}", path.display());
    Ok(())
}
