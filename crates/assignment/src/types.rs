//! Core types for cost-center assignment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single Copilot seat as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Login of the seat holder; the identity key
    pub username: String,
    /// When the seat was created, if the provider reported a parseable timestamp
    pub created_at: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn new(username: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            username: username.into(),
            created_at,
        }
    }
}

/// Which of the two cost centers a user belongs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Default: premium request overages are not allowed
    NoPru,
    /// Exception users: premium request overages are allowed
    PruAllowed,
}

impl Role {
    /// Both roles, in plan order
    pub const ALL: [Role; 2] = [Role::NoPru, Role::PruAllowed];

    /// Position in [`Role::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Self::NoPru => 0,
            Self::PruAllowed => 1,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoPru => "No PRU overages",
            Self::PruAllowed => "PRU overages allowed",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Opaque identifier of a provider cost center
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostCenterId(String);

impl CostCenterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Stand-in id for a cost center that plan mode could not (or would not) resolve
    pub fn pending(display_name: &str) -> Self {
        Self(format!("<pending: {display_name}>"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a plan-mode stand-in rather than a real provider id
    pub fn is_pending(&self) -> bool {
        self.0.starts_with("<pending: ")
    }
}

impl fmt::Display for CostCenterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configured description of one of the two cost centers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostCenterSpec {
    pub role: Role,
    /// Id from configuration; placeholders are treated as absent
    pub configured_id: Option<String>,
    /// Name used to look up or create the cost center
    pub display_name: String,
    pub auto_create: bool,
}

/// Pair of specs, one per role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostCenterSpecs {
    pub no_pru: CostCenterSpec,
    pub pru_allowed: CostCenterSpec,
}

impl CostCenterSpecs {
    pub fn get(&self, role: Role) -> &CostCenterSpec {
        match role {
            Role::NoPru => &self.no_pru,
            Role::PruAllowed => &self.pru_allowed,
        }
    }
}

/// How a cost center id was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Taken verbatim from configuration
    Configured,
    /// Found by display name
    Existing,
    /// Created during this run
    Created,
    /// Plan mode: absent, would be created on apply
    WouldCreate,
    /// Plan mode: absent and auto-create disabled
    Unresolved,
}

/// A resolved cost center for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCostCenter {
    pub role: Role,
    pub id: CostCenterId,
    pub display_name: String,
    pub source: ResolutionSource,
}

/// The two concrete cost centers a run assigns into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCostCenters {
    pub no_pru: ResolvedCostCenter,
    pub pru_allowed: ResolvedCostCenter,
}

impl ResolvedCostCenters {
    pub fn get(&self, role: Role) -> &ResolvedCostCenter {
        match role {
            Role::NoPru => &self.no_pru,
            Role::PruAllowed => &self.pru_allowed,
        }
    }

    pub fn id(&self, role: Role) -> &CostCenterId {
        &self.get(role).id
    }

    /// Whether every id is a real provider id (required before mutating)
    pub fn is_concrete(&self) -> bool {
        !self.no_pru.id.is_pending() && !self.pru_allowed.id.is_pending()
    }
}

/// Result of a single username within a submitted batch, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResult {
    pub username: String,
    pub success: bool,
    pub error: Option<String>,
}

impl UserResult {
    pub fn ok(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            success: true,
            error: None,
        }
    }

    pub fn rejected(username: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Recorded outcome for one username in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub username: String,
    pub cost_center_id: CostCenterId,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate for one submitted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub cost_center_id: CostCenterId,
    /// 1-indexed position within its group
    pub index: usize,
    pub total_batches: usize,
    pub size: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the whole batch call failed at transport level
    pub transport_error: Option<String>,
}

impl BatchReport {
    pub fn is_systemic_failure(&self) -> bool {
        self.transport_error.is_some()
    }
}

/// Per-cost-center counts in a run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterTally {
    pub cost_center_id: CostCenterId,
    pub role: Role,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Summary of an executed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates_skipped: usize,
    /// Batches whose call failed as a whole (network, auth, timeout)
    pub systemic_failures: usize,
    pub per_cost_center: Vec<CostCenterTally>,
}

impl RunSummary {
    /// Summary for a run that had nothing to do
    pub fn empty(duplicates_skipped: usize) -> Self {
        Self {
            duplicates_skipped,
            ..Default::default()
        }
    }

    /// Check if every attempted user succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// One-line summary used as the run's final line
    pub fn line(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} duplicates skipped ({} total)",
            self.succeeded, self.failed, self.duplicates_skipped, self.total
        )
    }
}

/// Persisted incremental-processing cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Seats created at or before this instant were attempted
    #[serde(rename = "last_run")]
    pub last_run_timestamp: DateTime<Utc>,
    /// When the record was written
    #[serde(rename = "saved_at")]
    pub updated_at: DateTime<Utc>,
}

/// Plan-only or plan-and-apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Plan,
    Apply,
}

impl Mode {
    pub fn is_apply(&self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Apply => write!(f, "apply"),
        }
    }
}
