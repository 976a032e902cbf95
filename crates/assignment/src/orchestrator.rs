//! Run orchestrator - drives one run through its phases
//!
//! ```text
//! INIT -> RESOLVE_COST_CENTERS -> FETCH_ROSTER -> PLAN
//!      -> plan mode:  REPORT
//!      -> apply mode: CONFIRM -> EXECUTE -> COMMIT_WATERMARK
//!      -> DONE
//! ```
//!
//! Any phase error ends in `FAILED`. Nothing is mutated before `CONFIRM`
//! except cost center auto-creation, which is never rolled back.

use crate::context::{
    ConfirmCallback, CostCenterClient, ProgressCallback, RunContext, SeatSource, WatermarkStore,
};
use crate::error::{Error, Result};
use crate::executor;
use crate::planner::{self, AssignmentPlan};
use crate::policy::ExceptionSet;
use crate::resolver::CostCenterResolver;
use crate::roster;
use crate::types::{
    AssignmentOutcome, CostCenterSpecs, Mode, ResolvedCostCenters, Role, RunSummary,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;

/// Phases of a run, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Init,
    ResolveCostCenters,
    FetchRoster,
    Plan,
    Report,
    Confirm,
    Execute,
    CommitWatermark,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::ResolveCostCenters => "RESOLVE_COST_CENTERS",
            Self::FetchRoster => "FETCH_ROSTER",
            Self::Plan => "PLAN",
            Self::Report => "REPORT",
            Self::Confirm => "CONFIRM",
            Self::Execute => "EXECUTE",
            Self::CommitWatermark => "COMMIT_WATERMARK",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// What to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: Mode,
    /// Only consider seats created after the stored watermark
    pub incremental: bool,
    /// Restrict the run to these usernames
    pub users: Option<Vec<String>>,
    /// Create missing cost centers regardless of the per-spec flag
    pub auto_create: bool,
    pub batch_size: NonZeroUsize,
    pub specs: CostCenterSpecs,
    pub exceptions: ExceptionSet,
}

/// What happened to the watermark
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum WatermarkStatus {
    /// Plan mode never writes
    NotApplicable,
    /// Execution had systemic batch failures
    Withheld { systemic_failures: usize },
    /// Only part of the roster was attempted
    Skipped { reason: String },
    Written { timestamp: DateTime<Utc> },
    /// Assignments stand; the next incremental run will redo them
    WriteFailed { message: String },
}

/// Overall result of a run that reached `DONE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Some users failed, or the watermark could not be saved
    CompletedWithFailures,
    /// Ended before any assignment was submitted
    Aborted,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Succeeded => 0,
            Self::Aborted => 1,
            Self::CompletedWithFailures => 2,
        }
    }
}

/// Everything a caller needs to render a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    /// Phase trace, ending in `Done`
    pub phases: Vec<RunPhase>,
    /// Incremental cutoff actually applied
    pub since: Option<DateTime<Utc>>,
    pub cost_centers: ResolvedCostCenters,
    pub total_listed: usize,
    pub duplicates_skipped: usize,
    pub missing_requested: Vec<String>,
    pub plan: AssignmentPlan,
    /// Present when `EXECUTE` ran
    pub summary: Option<RunSummary>,
    pub outcomes: Vec<AssignmentOutcome>,
    pub watermark: WatermarkStatus,
    pub status: RunStatus,
}

impl RunReport {
    /// Final line printed for every finished run
    pub fn summary_line(&self) -> String {
        match &self.summary {
            Some(summary) => summary.line(),
            None => format!(
                "plan only: {} users planned, {} duplicates skipped",
                self.plan.total_users(),
                self.duplicates_skipped
            ),
        }
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &AssignmentOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// Drives runs against a fixed set of collaborators
pub struct Orchestrator<'a> {
    seats: &'a dyn SeatSource,
    cost_centers: &'a dyn CostCenterClient,
    watermarks: &'a dyn WatermarkStore,
    phases: Vec<RunPhase>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        seats: &'a dyn SeatSource,
        cost_centers: &'a dyn CostCenterClient,
        watermarks: &'a dyn WatermarkStore,
    ) -> Self {
        Self {
            seats,
            cost_centers,
            watermarks,
            phases: Vec::new(),
        }
    }

    /// Phase trace of the last run, including `Failed` if it failed
    pub fn phases(&self) -> &[RunPhase] {
        &self.phases
    }

    /// Execute one run
    ///
    /// Returns the report when the run reached `DONE`, or the error that sent
    /// it to `FAILED`.
    pub fn run(
        &mut self,
        request: RunRequest,
        confirm: &mut dyn ConfirmCallback,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        self.phases.clear();
        match self.run_phases(request, confirm, progress) {
            Ok(report) => Ok(report),
            Err(e) => {
                let at = self.phases.last().copied().unwrap_or(RunPhase::Init);
                log::error!("Run failed during {}: {}", at, e);
                self.enter(RunPhase::Failed);
                Err(e)
            }
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        log::info!("Phase: {}", phase);
        self.phases.push(phase);
    }

    fn run_phases(
        &mut self,
        request: RunRequest,
        confirm: &mut dyn ConfirmCallback,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        self.enter(RunPhase::Init);
        let RunRequest {
            mode,
            incremental,
            users,
            auto_create,
            batch_size,
            specs,
            exceptions,
        } = request;
        let mut ctx = RunContext::new(mode, Utc::now(), exceptions);
        log::info!(
            "Starting {} run at {} ({} PRUs exception users)",
            mode,
            ctx.started_at.to_rfc3339(),
            ctx.exceptions.len()
        );

        self.enter(RunPhase::ResolveCostCenters);
        let resolved =
            CostCenterResolver::new(self.cost_centers, mode).resolve(&specs, auto_create)?;
        if mode.is_apply() && !resolved.is_concrete() {
            let role = if resolved.no_pru.id.is_pending() {
                Role::NoPru
            } else {
                Role::PruAllowed
            };
            return Err(Error::Configuration {
                role,
                message: "apply requires a concrete cost center id".to_string(),
            });
        }
        ctx.cost_centers = Some(resolved.clone());

        self.enter(RunPhase::FetchRoster);
        let since = if incremental {
            self.read_watermark()
        } else {
            None
        };
        let roster = roster::fetch(self.seats, users.as_deref(), since)?;
        ctx.duplicates_skipped = roster.duplicates_skipped;

        self.enter(RunPhase::Plan);
        let plan = planner::plan(&roster.seats, &ctx.exceptions, &resolved);
        for group in &plan.groups {
            log::info!(
                "{} users -> {} ({})",
                group.len(),
                group.cost_center_id,
                group.role
            );
        }

        let mut report = RunReport {
            mode,
            started_at: ctx.started_at,
            phases: Vec::new(),
            since,
            cost_centers: resolved,
            total_listed: roster.total_listed,
            duplicates_skipped: roster.duplicates_skipped,
            missing_requested: roster.missing_requested,
            plan,
            summary: None,
            outcomes: Vec::new(),
            watermark: WatermarkStatus::NotApplicable,
            status: RunStatus::Succeeded,
        };

        if !mode.is_apply() {
            self.enter(RunPhase::Report);
            log::info!(
                "MODE=plan: {} users would be assigned; no changes made",
                report.plan.total_users()
            );
            return Ok(self.finish(report));
        }

        if report.plan.is_empty() {
            log::info!("Nothing to assign; skipping confirmation");
        } else {
            self.enter(RunPhase::Confirm);
            let confirmed = confirm.confirm(&report.plan).unwrap_or_else(|e| {
                log::warn!("Confirmation failed: {:#}", e);
                false
            });
            if !confirmed {
                return Err(Error::AbortedByUser);
            }
        }

        self.enter(RunPhase::Execute);
        let summary = executor::execute(&mut ctx, &report.plan, batch_size, self.cost_centers, progress);

        self.enter(RunPhase::CommitWatermark);
        report.watermark = if users.is_some() {
            log::info!("Run restricted to requested users; watermark not updated");
            WatermarkStatus::Skipped {
                reason: "run was restricted to requested users".to_string(),
            }
        } else if summary.systemic_failures > 0 {
            log::warn!(
                "{} batches failed as a whole; watermark not updated",
                summary.systemic_failures
            );
            WatermarkStatus::Withheld {
                systemic_failures: summary.systemic_failures,
            }
        } else {
            match self.watermarks.write(ctx.started_at) {
                Ok(()) => WatermarkStatus::Written {
                    timestamp: ctx.started_at,
                },
                Err(e) => {
                    log::error!("{}", e);
                    WatermarkStatus::WriteFailed {
                        message: e.to_string(),
                    }
                }
            }
        };

        report.status = if summary.is_success()
            && !matches!(report.watermark, WatermarkStatus::WriteFailed { .. })
        {
            RunStatus::Succeeded
        } else {
            RunStatus::CompletedWithFailures
        };
        report.summary = Some(summary);
        report.outcomes = ctx.outcomes;
        Ok(self.finish(report))
    }

    /// Read the cutoff; a failed read degrades to a full run
    fn read_watermark(&self) -> Option<DateTime<Utc>> {
        match self.watermarks.read() {
            Ok(Some(ts)) => {
                log::info!("Incremental: processing seats created after {}", ts.to_rfc3339());
                Some(ts)
            }
            Ok(None) => {
                log::info!("Incremental: no previous run recorded; processing all seats");
                None
            }
            Err(e) => {
                log::warn!("{}; processing all seats", e);
                None
            }
        }
    }

    fn finish(&mut self, mut report: RunReport) -> RunReport {
        self.enter(RunPhase::Done);
        report.phases = self.phases.clone();
        report
    }
}
