//! In-memory collaborators for unit tests

use crate::context::{
    CostCenterClient, ProgressCallback, RunContext, SeatSource, WatermarkStore,
};
use crate::error::{Error, Result as RunResult};
use crate::policy::ExceptionSet;
use crate::types::{
    AssignmentOutcome, BatchReport, CostCenterId, CostCenterSpec, CostCenterSpecs, Mode,
    ResolutionSource, ResolvedCostCenter, ResolvedCostCenters, Role, Seat, UserResult,
};
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io;

pub const NO_PRU_NAME: &str = "00 - No PRU overages";
pub const PRU_ALLOWED_NAME: &str = "01 - PRU overages allowed";

/// Instant `secs` seconds after the epoch
pub fn t(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn seat(name: &str, created_secs: i64) -> Seat {
    Seat::new(name, Some(t(created_secs)))
}

pub fn specs(no_pru_id: Option<&str>, pru_id: Option<&str>, auto_create: bool) -> CostCenterSpecs {
    CostCenterSpecs {
        no_pru: CostCenterSpec {
            role: Role::NoPru,
            configured_id: no_pru_id.map(String::from),
            display_name: NO_PRU_NAME.to_string(),
            auto_create,
        },
        pru_allowed: CostCenterSpec {
            role: Role::PruAllowed,
            configured_id: pru_id.map(String::from),
            display_name: PRU_ALLOWED_NAME.to_string(),
            auto_create,
        },
    }
}

pub fn resolved(no_pru_id: &str, pru_id: &str) -> ResolvedCostCenters {
    let one = |role, id: &str, name: &str| ResolvedCostCenter {
        role,
        id: CostCenterId::new(id),
        display_name: name.to_string(),
        source: ResolutionSource::Configured,
    };
    ResolvedCostCenters {
        no_pru: one(Role::NoPru, no_pru_id, NO_PRU_NAME),
        pru_allowed: one(Role::PruAllowed, pru_id, PRU_ALLOWED_NAME),
    }
}

pub fn run_context() -> RunContext {
    RunContext::new(Mode::Apply, t(1_000), ExceptionSet::default())
}

/// Seat source returning a fixed listing
pub struct StaticSeats(pub Vec<Seat>);

impl SeatSource for StaticSeats {
    fn list_seats(&self) -> Result<Vec<Seat>> {
        Ok(self.0.clone())
    }
}

/// Seat source that always fails
pub struct FailingSeats;

impl SeatSource for FailingSeats {
    fn list_seats(&self) -> Result<Vec<Seat>> {
        bail!("HTTP 401: Bad credentials")
    }
}

/// Scriptable cost center provider
///
/// Created cost centers become visible to later lookups. Assignment calls are
/// recorded and answered per user unless scripted otherwise.
#[derive(Default)]
pub struct FakeCostCenters {
    existing: RefCell<Vec<(String, CostCenterId)>>,
    created: RefCell<Vec<String>>,
    lookups: Cell<usize>,
    deny_creation: bool,
    fail_lookup: bool,
    rejected: HashSet<String>,
    omitted: HashSet<String>,
    failing_calls: HashSet<usize>,
    calls: RefCell<Vec<(CostCenterId, Vec<String>)>>,
}

impl FakeCostCenters {
    pub fn with_existing(existing: &[(&str, &str)]) -> Self {
        Self {
            existing: RefCell::new(
                existing
                    .iter()
                    .map(|(name, id)| ((*name).to_string(), CostCenterId::new(*id)))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn denying_creation() -> Self {
        Self {
            deny_creation: true,
            ..Default::default()
        }
    }

    pub fn failing_lookup() -> Self {
        Self {
            fail_lookup: true,
            ..Default::default()
        }
    }

    /// Reject these users in every batch
    pub fn rejecting(mut self, users: &[&str]) -> Self {
        self.rejected = users.iter().map(|u| (*u).to_string()).collect();
        self
    }

    /// Leave these users out of every response
    pub fn omitting(mut self, users: &[&str]) -> Self {
        self.omitted = users.iter().map(|u| (*u).to_string()).collect();
        self
    }

    /// Fail these assignment calls (1-based, across the run) at transport level
    pub fn failing_batches(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.iter().copied().collect();
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.borrow().clone()
    }

    pub fn assign_calls(&self) -> Vec<(CostCenterId, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl CostCenterClient for FakeCostCenters {
    fn find_by_name(&self, name: &str) -> Result<Option<CostCenterId>> {
        self.lookups.set(self.lookups.get() + 1);
        if self.fail_lookup {
            bail!("HTTP 503: Service Unavailable");
        }
        Ok(self
            .existing
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone()))
    }

    fn create(&self, name: &str) -> Result<CostCenterId> {
        if self.deny_creation {
            return Err(anyhow!("HTTP 403: Resource not accessible"));
        }
        let mut created = self.created.borrow_mut();
        created.push(name.to_string());
        let id = CostCenterId::new(format!("cc-new-{}", created.len()));
        self.existing.borrow_mut().push((name.to_string(), id.clone()));
        Ok(id)
    }

    fn assign_batch(&self, cost_center: &CostCenterId, usernames: &[String]) -> Result<Vec<UserResult>> {
        let mut calls = self.calls.borrow_mut();
        calls.push((cost_center.clone(), usernames.to_vec()));
        if self.failing_calls.contains(&calls.len()) {
            bail!("network error: connection reset by peer");
        }
        Ok(usernames
            .iter()
            .filter(|u| !self.omitted.contains(*u))
            .map(|u| {
                if self.rejected.contains(u) {
                    UserResult::rejected(u.as_str(), "user is not a member of the enterprise")
                } else {
                    UserResult::ok(u.as_str())
                }
            })
            .collect())
    }
}

/// Counts progress events
#[derive(Default)]
pub struct RecordingProgress {
    pub groups: usize,
    pub outcomes: Vec<String>,
    pub batches: usize,
}

impl ProgressCallback for RecordingProgress {
    fn on_group_start(&mut self, _cost_center: &CostCenterId, _users: usize, _batches: usize) {
        self.groups += 1;
    }

    fn on_outcome(&mut self, outcome: &AssignmentOutcome) {
        self.outcomes.push(outcome.username.clone());
    }

    fn on_batch_complete(&mut self, _report: &BatchReport) {
        self.batches += 1;
    }
}

/// Watermark store held in memory
#[derive(Default)]
pub struct MemoryWatermarks {
    value: Cell<Option<DateTime<Utc>>>,
    writes: Cell<usize>,
    fail_read: bool,
    fail_write: bool,
}

impl MemoryWatermarks {
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self {
            value: Cell::new(Some(ts)),
            ..Default::default()
        }
    }

    pub fn unreadable() -> Self {
        Self {
            fail_read: true,
            ..Default::default()
        }
    }

    pub fn unwritable() -> Self {
        Self {
            fail_write: true,
            ..Default::default()
        }
    }

    pub fn value(&self) -> Option<DateTime<Utc>> {
        self.value.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl WatermarkStore for MemoryWatermarks {
    fn read(&self) -> RunResult<Option<DateTime<Utc>>> {
        if self.fail_read {
            return Err(Error::persistence(
                "memory",
                io::Error::new(io::ErrorKind::InvalidData, "corrupt"),
            ));
        }
        Ok(self.value.get())
    }

    fn write(&self, timestamp: DateTime<Utc>) -> RunResult<()> {
        if self.fail_write {
            return Err(Error::persistence(
                "memory",
                io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.writes.set(self.writes.get() + 1);
        self.value.set(Some(timestamp));
        Ok(())
    }
}
