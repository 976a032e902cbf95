//! `ccsync assign`

use crate::Context;
use crate::cli::{AssignArgs, requested_users};
use crate::config::{Config, cost_center_url};
use crate::progress::AssignProgress;
use crate::ui;
use anyhow::{Context as _, Result};
use assignment::{
    AssignmentPlan, ConfirmCallback, FileWatermarkStore, Mode, Orchestrator, ResolutionSource,
    RunReport, RunRequest, RunStatus, WatermarkStatus,
};
use colored::Colorize;
use dialoguer::Input;
use std::process::ExitCode;

/// Failed users printed without `-v`
const FAILED_PREVIEW: usize = 20;

pub fn run(ctx: &Context, args: AssignArgs) -> Result<ExitCode> {
    let config = super::load_config(ctx)?;
    let github = super::connect(&config)?;
    let store = FileWatermarkStore::new(config.watermark_path()?);
    let mode = Mode::from(args.mode);
    let exceptions = config.exceptions();
    let users = requested_users(args.users);

    if !ctx.quiet {
        ui::header("Copilot cost center assignment");
        ui::kv("Enterprise", github.enterprise());
        ui::kv("Mode", &mode.to_string());
        ui::kv(
            "Incremental",
            if args.incremental { "yes" } else { "no (full run)" },
        );
        ui::kv("PRUs exception users", &exceptions.len().to_string());
        if let Some(users) = &users {
            ui::kv("Users", &ui::name_list(users, 10));
        }
        ui::kv("Watermark", &store.path().display().to_string());
    }

    let request = RunRequest {
        mode,
        incremental: args.incremental,
        users,
        auto_create: args.create_cost_centers,
        batch_size: config.batch_size(),
        specs: config.specs(),
        exceptions,
    };

    let mut confirm = TerminalConfirm {
        yes: args.yes,
        verbose: ctx.verbose,
    };
    let mut progress = AssignProgress::new(ctx.quiet);
    let mut orchestrator = Orchestrator::new(&github, &github, &store);
    let result = orchestrator.run(request, &mut confirm, &mut progress);
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(assignment::Error::AbortedByUser) => {
            ui::warn("Aborted: no assignments were made");
            return Ok(ExitCode::from(RunStatus::Aborted.exit_code()));
        }
        Err(e) => return Err(e).context("Assignment run failed"),
    };

    print_report(ctx, &report);
    if args.summary_report {
        print_summary_report(&config, &report, github.enterprise());
    }
    print_final_line(&report);

    Ok(ExitCode::from(report.status.exit_code()))
}

// ============================================================================
// Confirmation
// ============================================================================

/// Prompts on the terminal before apply
struct TerminalConfirm {
    yes: bool,
    verbose: u8,
}

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, plan: &AssignmentPlan) -> Result<bool> {
        print_plan(plan, self.verbose);

        if self.yes {
            log::info!("Apply confirmed with --yes");
            return Ok(true);
        }
        if !console::user_attended() {
            ui::warn("Not running in a terminal; pass --yes to apply");
            return Ok(false);
        }

        println!();
        ui::warn(&format!(
            "About to assign {} to cost centers",
            ui::plural(plan.total_users(), "user")
        ));
        let answer: String = Input::new()
            .with_prompt("Type 'apply' to continue")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read confirmation")?;
        Ok(is_confirmation(&answer))
    }
}

fn is_confirmation(answer: &str) -> bool {
    answer.trim() == "apply"
}

// ============================================================================
// Output
// ============================================================================

fn print_plan(plan: &AssignmentPlan, verbose: u8) {
    ui::section("Plan");
    for group in &plan.groups {
        let target = format!("{} ({})", group.role, group.cost_center_id);
        println!(
            "  {} {} -> {}",
            "•".cyan(),
            ui::plural(group.len(), "user"),
            target.as_str().bold()
        );
        if verbose > 0 {
            for username in &group.usernames {
                ui::dim(&format!("  {}", username));
            }
        }
    }
}

fn source_label(source: ResolutionSource) -> &'static str {
    match source {
        ResolutionSource::Configured => "configured",
        ResolutionSource::Existing => "found by name",
        ResolutionSource::Created => "created",
        ResolutionSource::WouldCreate => "would be created",
        ResolutionSource::Unresolved => "not found",
    }
}

fn print_report(ctx: &Context, report: &RunReport) {
    if ctx.quiet {
        return;
    }

    ui::section("Cost centers");
    for role in assignment::Role::ALL {
        let cc = report.cost_centers.get(role);
        ui::kv(
            role.label(),
            &format!("{} [{}] ({})", cc.display_name, cc.id, source_label(cc.source)),
        );
    }

    ui::section("Roster");
    ui::kv("Seats listed", &report.total_listed.to_string());
    ui::kv("Duplicates skipped", &report.duplicates_skipped.to_string());
    if let Some(since) = report.since {
        ui::kv("Created after", &ui::format_timestamp(Some(since)));
    }
    if !report.missing_requested.is_empty() {
        ui::warn(&format!(
            "Requested users without a Copilot seat: {}",
            ui::name_list(&report.missing_requested, 10)
        ));
    }

    if report.summary.is_none() {
        print_plan(&report.plan, ctx.verbose);
    }

    let failed: Vec<_> = report.failed_outcomes().collect();
    if !failed.is_empty() {
        ui::section("Failed users");
        let shown = if ctx.verbose > 0 {
            failed.len()
        } else {
            FAILED_PREVIEW
        };
        for outcome in failed.iter().take(shown) {
            println!(
                "  {} {} ({}): {}",
                "✗".red(),
                outcome.username,
                outcome.cost_center_id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        if failed.len() > shown {
            ui::dim(&format!("... and {} more (use -v to list all)", failed.len() - shown));
        }
    }

    match &report.watermark {
        WatermarkStatus::NotApplicable => {}
        WatermarkStatus::Written { timestamp } => ui::info(&format!(
            "Watermark updated to {}",
            ui::format_timestamp(Some(*timestamp))
        )),
        WatermarkStatus::Withheld { systemic_failures } => ui::warn(&format!(
            "Watermark not updated: {} failed as a whole",
            ui::plural(*systemic_failures, "batch call")
        )),
        WatermarkStatus::Skipped { reason } => {
            ui::info(&format!("Watermark not updated: {}", reason));
        }
        WatermarkStatus::WriteFailed { message } => {
            ui::error(&format!("Could not save watermark: {}", message));
        }
    }
}

fn print_summary_report(config: &Config, report: &RunReport, enterprise: &str) {
    ui::header("Cost center summary");
    for role in assignment::Role::ALL {
        let cc = report.cost_centers.get(role);
        ui::section(&cc.display_name);
        ui::kv("ID", cc.id.as_str());
        if !cc.id.is_pending() {
            ui::kv("URL", &cost_center_url(enterprise, cc.id.as_str()));
        }
        let planned = report.plan.group(role).map_or(0, |g| g.len());
        ui::kv("Users planned", &planned.to_string());
        if let Some(tally) = report
            .summary
            .as_ref()
            .and_then(|s| s.per_cost_center.iter().find(|t| t.role == role))
        {
            ui::kv("Assigned", &tally.succeeded.to_string());
            ui::kv("Failed", &tally.failed.to_string());
        }
    }
    if !config.cost_centers.prus_exception_users.is_empty() {
        ui::section("PRUs exception users");
        for user in config.exceptions().iter() {
            ui::dim(user);
        }
    }
}

fn print_final_line(report: &RunReport) {
    println!();
    let line = report.summary_line();
    match report.status {
        RunStatus::Succeeded => ui::success(&line),
        RunStatus::CompletedWithFailures | RunStatus::Aborted => ui::warn(&line),
    }
}
