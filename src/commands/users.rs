//! `ccsync users`

use crate::Context;
use crate::cli::{UsersCommand, requested_users};
use crate::ui;
use anyhow::{Context as _, Result};
use assignment::{ExceptionSet, FileWatermarkStore, Roster, Seat, WatermarkStore};
use colored::Colorize;

pub fn run(ctx: &Context, cmd: UsersCommand) -> Result<()> {
    match cmd {
        UsersCommand::List { users, incremental } => {
            list(ctx, requested_users(users), incremental)
        }
    }
}

fn list(ctx: &Context, users: Option<Vec<String>>, incremental: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let github = super::connect(&config)?;
    let store = FileWatermarkStore::new(config.watermark_path()?);

    let since = if incremental {
        match store.read() {
            Ok(since) => since,
            Err(e) => {
                ui::warn(&format!("{}; listing all seats", e));
                None
            }
        }
    } else {
        None
    };

    let roster = assignment::fetch(&github, users.as_deref(), since)
        .context("Could not list Copilot seats")?;
    let exceptions = config.exceptions();

    ui::header("Copilot seats");
    if let Some(since) = since {
        ui::kv("Created after", &ui::format_timestamp(Some(since)));
    }
    for seat in &roster.seats {
        println!("{}", seat_line(seat, &exceptions));
    }

    println!();
    ui::info(&summary(&roster, &exceptions));
    if !roster.missing_requested.is_empty() {
        ui::warn(&format!(
            "Requested users without a Copilot seat: {}",
            ui::name_list(&roster.missing_requested, 10)
        ));
    }
    Ok(())
}

fn seat_line(seat: &Seat, exceptions: &ExceptionSet) -> String {
    let created = ui::format_timestamp(seat.created_at);
    if exceptions.contains(&seat.username) {
        format!(
            "  {:<39} {}  {}",
            seat.username,
            created.dimmed(),
            "[PRUs exception]".yellow()
        )
    } else {
        format!("  {:<39} {}", seat.username, created.dimmed())
    }
}

fn summary(roster: &Roster, exceptions: &ExceptionSet) -> String {
    let exception_count = roster
        .seats
        .iter()
        .filter(|s| exceptions.contains(&s.username))
        .count();
    format!(
        "{} ({} PRUs exception), {} duplicates skipped",
        ui::plural(roster.len(), "user"),
        exception_count,
        roster.duplicates_skipped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_line_marks_exceptions() {
        colored::control::set_override(false);
        let exceptions = ExceptionSet::new(["bob"]);

        let line = seat_line(&Seat::new("bob", None), &exceptions);
        assert!(line.contains("bob"));
        assert!(line.ends_with("[PRUs exception]"));

        let line = seat_line(&Seat::new("alice", None), &exceptions);
        assert!(!line.contains("[PRUs exception]"));
    }

    #[test]
    fn test_summary_counts() {
        let roster = Roster {
            seats: vec![Seat::new("alice", None), Seat::new("bob", None)],
            total_listed: 3,
            duplicates_skipped: 1,
            missing_requested: Vec::new(),
        };
        let exceptions = ExceptionSet::new(["bob", "carol"]);
        assert_eq!(
            summary(&roster, &exceptions),
            "2 users (1 PRUs exception), 1 duplicates skipped"
        );
    }
}
