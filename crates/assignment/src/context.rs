//! Collaborator traits and the per-run context
//!
//! The engine reaches the provider only through [`SeatSource`] and
//! [`CostCenterClient`], and persistence only through [`WatermarkStore`].
//! Progress and confirmation are injected the same way so the engine has no
//! dependency on a terminal.

use crate::error::Result as RunResult;
use crate::planner::AssignmentPlan;
use crate::policy::ExceptionSet;
use crate::types::{
    AssignmentOutcome, BatchReport, CostCenterId, Mode, ResolvedCostCenters, Seat, UserResult,
};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Lists licensed users
pub trait SeatSource {
    /// Return every seat, unpaginated. Must not silently drop seats.
    fn list_seats(&self) -> Result<Vec<Seat>>;
}

/// Provider operations on cost centers
pub trait CostCenterClient {
    /// Look up an active cost center by display name
    fn find_by_name(&self, name: &str) -> Result<Option<CostCenterId>>;

    /// Create a cost center and return its id
    fn create(&self, name: &str) -> Result<CostCenterId>;

    /// Assign a batch of users, reporting each user's result.
    ///
    /// An `Err` means the call failed as a whole (network, auth, timeout).
    fn assign_batch(&self, cost_center: &CostCenterId, usernames: &[String])
    -> Result<Vec<UserResult>>;
}

/// Persists the incremental-processing cutoff
pub trait WatermarkStore {
    /// Read the last successful run's cutoff, `None` if never written
    fn read(&self) -> RunResult<Option<DateTime<Utc>>>;

    /// Overwrite the cutoff
    fn write(&self, timestamp: DateTime<Utc>) -> RunResult<()>;
}

/// Progress callback for execution
///
/// Implement this trait to receive outcomes as they complete.
pub trait ProgressCallback {
    /// Called before a cost center's batches are submitted
    fn on_group_start(&mut self, cost_center: &CostCenterId, users: usize, batches: usize);

    /// Called once per username as its outcome is recorded
    fn on_outcome(&mut self, outcome: &AssignmentOutcome);

    /// Called once per submitted batch
    fn on_batch_complete(&mut self, report: &BatchReport);
}

/// Confirmation callback for apply mode
pub trait ConfirmCallback {
    /// Ask whether the plan should be applied
    fn confirm(&mut self, plan: &AssignmentPlan) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_group_start(&mut self, _cost_center: &CostCenterId, _users: usize, _batches: usize) {}
    fn on_outcome(&mut self, _outcome: &AssignmentOutcome) {}
    fn on_batch_complete(&mut self, _report: &BatchReport) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _plan: &AssignmentPlan) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _plan: &AssignmentPlan) -> Result<bool> {
        Ok(false)
    }
}

/// State carried through a single run
///
/// Holds everything a phase needs from earlier phases; nothing about a run
/// lives outside this value.
#[derive(Debug)]
pub struct RunContext {
    pub mode: Mode,
    /// Instant the run started; becomes the watermark on success
    pub started_at: DateTime<Utc>,
    pub exceptions: ExceptionSet,
    /// Filled in by cost center resolution
    pub cost_centers: Option<ResolvedCostCenters>,
    /// Filled in by roster fetch
    pub duplicates_skipped: usize,
    /// Accumulated by the batch executor
    pub outcomes: Vec<AssignmentOutcome>,
    /// Accumulated by the batch executor
    pub batches: Vec<BatchReport>,
}

impl RunContext {
    pub fn new(mode: Mode, started_at: DateTime<Utc>, exceptions: ExceptionSet) -> Self {
        Self {
            mode,
            started_at,
            exceptions,
            cost_centers: None,
            duplicates_skipped: 0,
            outcomes: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Number of batches that failed as a whole
    pub fn systemic_failures(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.is_systemic_failure())
            .count()
    }
}
