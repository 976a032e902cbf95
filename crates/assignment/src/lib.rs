//! # Assignment
//!
//! Engine that keeps every Copilot seat holder in exactly one of two billing
//! cost centers: the default "no PRU overages" center, or the "PRU overages
//! allowed" center for a configured set of exception users.
//!
//! ## Core Concepts
//!
//! - **Roster**: deduplicated seats, optionally filtered to seats created after
//!   the watermark and to an explicit user list
//! - **Cost center resolution**: configured id, else lookup by name, else
//!   (apply mode, auto-create on) creation
//! - **AssignmentPlan**: the roster partitioned into one group per cost center
//! - **Executor**: submits each group in bounded batches and records a
//!   per-user outcome; a failed batch never stops the run
//! - **Watermark**: cutoff of the last successful apply run
//!
//! ## Example
//!
//! ```ignore
//! use assignment::{
//!     AutoConfirm, ExceptionSet, FileWatermarkStore, Mode, NoProgress,
//!     Orchestrator, RunRequest, DEFAULT_BATCH_SIZE,
//! };
//!
//! let store = FileWatermarkStore::new("/var/lib/ccsync/last_run.json");
//! let mut orchestrator = Orchestrator::new(&github, &github, &store);
//!
//! let report = orchestrator.run(
//!     RunRequest {
//!         mode: Mode::Apply,
//!         incremental: true,
//!         users: None,
//!         auto_create: false,
//!         batch_size: DEFAULT_BATCH_SIZE,
//!         specs,
//!         exceptions: ExceptionSet::new(["octocat"]),
//!     },
//!     &mut AutoConfirm,
//!     &mut NoProgress,
//! )?;
//! println!("{}", report.summary_line());
//! ```
//!
//! ## Provider Traits
//!
//! - [`SeatSource`]: lists Copilot seats
//! - [`CostCenterClient`]: finds, creates and assigns into cost centers
//! - [`WatermarkStore`]: persists the incremental cutoff
//! - [`ProgressCallback`]: receives per-user and per-batch events
//! - [`ConfirmCallback`]: gates apply mode
//!
//! The engine has no knowledge of HTTP, terminals or configuration files.

pub mod context;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod planner;
pub mod policy;
pub mod resolver;
pub mod roster;
pub mod types;
pub mod watermark;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, CostCenterClient, NoProgress, ProgressCallback,
    RunContext, SeatSource, WatermarkStore,
};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, execute};
pub use orchestrator::{Orchestrator, RunPhase, RunReport, RunRequest, RunStatus, WatermarkStatus};
pub use planner::{AssignmentPlan, PlanGroup, plan};
pub use policy::ExceptionSet;
pub use resolver::{CostCenterResolver, is_placeholder};
pub use roster::{Roster, fetch};
pub use types::{
    AssignmentOutcome, BatchReport, CostCenterId, CostCenterSpec, CostCenterSpecs, CostCenterTally,
    Mode, ResolutionSource, ResolvedCostCenter, ResolvedCostCenters, Role, RunSummary, Seat,
    UserResult, Watermark,
};
pub use watermark::FileWatermarkStore;
