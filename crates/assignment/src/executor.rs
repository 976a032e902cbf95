//! Batch executor - submits plan groups in bounded, sequential batches

use crate::context::{CostCenterClient, ProgressCallback, RunContext};
use crate::planner::{AssignmentPlan, PlanGroup};
use crate::types::{AssignmentOutcome, BatchReport, CostCenterTally, RunSummary, UserResult};
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Provider limit on users per assignment call
pub const MAX_BATCH_SIZE: usize = 50;

/// Batch size used unless configured otherwise
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(MAX_BATCH_SIZE) {
    Some(n) => n,
    None => panic!("batch size must be non-zero"),
};

/// Execute a plan
///
/// Each group is split into contiguous batches of at most `batch_size` users,
/// submitted one at a time. Every username gets its own outcome from the
/// provider response. A batch call that fails outright marks all of its users
/// failed and execution moves on; nothing is retried here.
///
/// Outcomes and batch reports are appended to `ctx`.
pub fn execute(
    ctx: &mut RunContext,
    plan: &AssignmentPlan,
    batch_size: NonZeroUsize,
    client: &dyn CostCenterClient,
    progress: &mut dyn ProgressCallback,
) -> RunSummary {
    let mut summary = RunSummary::empty(ctx.duplicates_skipped);

    for group in plan.non_empty_groups() {
        let tally = execute_group(ctx, group, batch_size, client, progress);
        summary.total += tally.attempted;
        summary.succeeded += tally.succeeded;
        summary.failed += tally.failed;
        summary.per_cost_center.push(tally);
    }
    summary.systemic_failures = ctx.systemic_failures();

    if summary.failed > 0 {
        log::warn!(
            "FINAL RESULT: {}/{} users assigned ({} failed)",
            summary.succeeded,
            summary.total,
            summary.failed
        );
    } else {
        log::info!("FINAL RESULT: all {} users assigned", summary.succeeded);
    }
    summary
}

fn execute_group(
    ctx: &mut RunContext,
    group: &PlanGroup,
    batch_size: NonZeroUsize,
    client: &dyn CostCenterClient,
    progress: &mut dyn ProgressCallback,
) -> CostCenterTally {
    let batches: Vec<&[String]> = group.usernames.chunks(batch_size.get()).collect();
    let total_batches = batches.len();
    log::info!(
        "Processing {} users for cost center {} in {} batches",
        group.len(),
        group.cost_center_id,
        total_batches
    );
    progress.on_group_start(&group.cost_center_id, group.len(), total_batches);

    let mut tally = CostCenterTally {
        cost_center_id: group.cost_center_id.clone(),
        role: group.role,
        attempted: 0,
        succeeded: 0,
        failed: 0,
    };

    for (i, batch) in batches.into_iter().enumerate() {
        let index = i + 1;
        log::info!(
            "Batch {}/{} ({} users) for cost center {}",
            index,
            total_batches,
            batch.len(),
            group.cost_center_id
        );

        let (outcomes, transport_error) = match client.assign_batch(&group.cost_center_id, batch) {
            Ok(results) => (match_results(group, batch, results), None),
            Err(e) => {
                let message = format!("{e:#}");
                log::error!(
                    "Batch {}/{} for cost center {} failed: {}",
                    index,
                    total_batches,
                    group.cost_center_id,
                    message
                );
                let outcomes = batch
                    .iter()
                    .map(|username| AssignmentOutcome {
                        username: username.clone(),
                        cost_center_id: group.cost_center_id.clone(),
                        success: false,
                        error: Some(message.clone()),
                    })
                    .collect();
                (outcomes, Some(message))
            }
        };

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let report = BatchReport {
            cost_center_id: group.cost_center_id.clone(),
            index,
            total_batches,
            size: batch.len(),
            succeeded,
            failed: batch.len() - succeeded,
            transport_error,
        };

        for outcome in outcomes {
            if outcome.success {
                log::debug!("{} -> {}", outcome.username, outcome.cost_center_id);
            } else {
                log::warn!(
                    "{} -> {} failed: {}",
                    outcome.username,
                    outcome.cost_center_id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            progress.on_outcome(&outcome);
            ctx.outcomes.push(outcome);
        }

        if report.failed > 0 {
            log::warn!(
                "Batch {} completed: {} successful, {} failed",
                index,
                report.succeeded,
                report.failed
            );
        } else {
            log::info!("Batch {} completed: all {} users successful", index, report.succeeded);
        }

        tally.attempted += report.size;
        tally.succeeded += report.succeeded;
        tally.failed += report.failed;
        progress.on_batch_complete(&report);
        ctx.batches.push(report);
    }

    tally
}

/// Pair each submitted username with its reported result, in batch order
///
/// A username the provider did not report on counts as failed.
fn match_results(group: &PlanGroup, batch: &[String], results: Vec<UserResult>) -> Vec<AssignmentOutcome> {
    let mut by_user: HashMap<String, UserResult> = HashMap::with_capacity(results.len());
    for result in results {
        if !batch.contains(&result.username) {
            log::warn!(
                "Provider reported on {} which was not in the batch; ignoring",
                result.username
            );
            continue;
        }
        by_user.entry(result.username.clone()).or_insert(result);
    }

    batch
        .iter()
        .map(|username| match by_user.remove(username) {
            Some(result) => AssignmentOutcome {
                username: username.clone(),
                cost_center_id: group.cost_center_id.clone(),
                success: result.success,
                error: if result.success {
                    None
                } else {
                    Some(result.error.unwrap_or_else(|| "rejected by provider".to_string()))
                },
            },
            None => AssignmentOutcome {
                username: username.clone(),
                cost_center_id: group.cost_center_id.clone(),
                success: false,
                error: Some("no result reported by provider".to_string()),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::planner::plan;
    use crate::policy::ExceptionSet;
    use crate::testing::{FakeCostCenters, RecordingProgress, resolved, run_context, seat};
    use crate::types::{CostCenterId, Role, Seat};

    fn roster(names: &[&str]) -> Vec<Seat> {
        names.iter().map(|n| seat(n, 1)).collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_batches_split_in_order() {
        let names: Vec<String> = (0..7).map(|i| format!("u{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let plan = plan(&roster(&refs), &ExceptionSet::default(), &resolved("a", "b"));
        let client = FakeCostCenters::default();
        let mut ctx = run_context();

        let summary = execute(&mut ctx, &plan, size(3), &client, &mut NoProgress);

        let calls = client.assign_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1, vec!["u0", "u1", "u2"]);
        assert_eq!(calls[1].1, vec!["u3", "u4", "u5"]);
        assert_eq!(calls[2].1, vec!["u6"]);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.succeeded, 7);
        assert!(summary.is_success());
    }

    #[test]
    fn test_partial_batch_failure_isolated() {
        let plan = plan(
            &roster(&["a", "b", "c", "d", "e"]),
            &ExceptionSet::default(),
            &resolved("cc", "other"),
        );
        let client = FakeCostCenters::default().rejecting(&["b"]);
        let mut ctx = run_context();

        let summary = execute(&mut ctx, &plan, size(3), &client, &mut NoProgress);

        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.systemic_failures, 0);
        assert_eq!(ctx.batches[0].succeeded, 2);
        assert_eq!(ctx.batches[0].failed, 1);
        assert_eq!(ctx.batches[1].succeeded, 2);
        let failed: Vec<_> = ctx.outcomes.iter().filter(|o| !o.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].username, "b");
    }

    #[test]
    fn test_transport_failure_continues() {
        let plan = plan(
            &roster(&["a", "b", "c", "x"]),
            &ExceptionSet::new(["x"]),
            &resolved("no-pru", "pru"),
        );
        // first batch of the no-pru group fails outright
        let client = FakeCostCenters::default().failing_batches(&[1]);
        let mut ctx = run_context();

        let summary = execute(&mut ctx, &plan, size(2), &client, &mut NoProgress);

        assert_eq!(client.assign_calls().len(), 3);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.systemic_failures, 1);
        assert!(ctx.batches[0].is_systemic_failure());
        assert!(
            ctx.outcomes[..2]
                .iter()
                .all(|o| !o.success && o.error.as_deref().unwrap().contains("connection reset"))
        );
    }

    #[test]
    fn test_missing_result_counts_as_failure() {
        let plan = plan(&roster(&["a", "b"]), &ExceptionSet::default(), &resolved("cc", "x"));
        let client = FakeCostCenters::default().omitting(&["b"]);
        let mut ctx = run_context();

        let summary = execute(&mut ctx, &plan, size(50), &client, &mut NoProgress);

        assert_eq!(summary.failed, 1);
        assert_eq!(
            ctx.outcomes[1].error.as_deref(),
            Some("no result reported by provider")
        );
    }

    #[test]
    fn test_per_cost_center_tally() {
        let plan = plan(
            &roster(&["a", "b", "c"]),
            &ExceptionSet::new(["b"]),
            &resolved("no-pru", "pru"),
        );
        let client = FakeCostCenters::default();
        let mut ctx = run_context();
        ctx.duplicates_skipped = 2;

        let summary = execute(&mut ctx, &plan, DEFAULT_BATCH_SIZE, &client, &mut NoProgress);

        assert_eq!(summary.duplicates_skipped, 2);
        assert_eq!(summary.per_cost_center.len(), 2);
        assert_eq!(summary.per_cost_center[0].role, Role::NoPru);
        assert_eq!(summary.per_cost_center[0].attempted, 2);
        assert_eq!(summary.per_cost_center[1].cost_center_id, CostCenterId::new("pru"));
        assert_eq!(summary.per_cost_center[1].succeeded, 1);
    }

    #[test]
    fn test_emits_events() {
        let plan = plan(&roster(&["a", "b", "c"]), &ExceptionSet::default(), &resolved("cc", "x"));
        let client = FakeCostCenters::default();
        let mut ctx = run_context();
        let mut progress = RecordingProgress::default();

        execute(&mut ctx, &plan, size(2), &client, &mut progress);

        assert_eq!(progress.groups, 1);
        assert_eq!(progress.outcomes, vec!["a", "b", "c"]);
        assert_eq!(progress.batches, 2);
    }

    #[test]
    fn test_empty_plan_makes_no_calls() {
        let plan = plan(&[], &ExceptionSet::default(), &resolved("cc", "x"));
        let client = FakeCostCenters::default();
        let mut ctx = run_context();

        let summary = execute(&mut ctx, &plan, DEFAULT_BATCH_SIZE, &client, &mut NoProgress);

        assert!(client.assign_calls().is_empty());
        assert_eq!(summary, RunSummary::default());
    }
}
