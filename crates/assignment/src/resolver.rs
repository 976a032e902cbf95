//! Cost center resolution
//!
//! Turns the two configured [`CostCenterSpec`]s into concrete ids. A
//! configured id is used as-is; otherwise the cost center is looked up by
//! display name and, if allowed, created. Creation is committed immediately
//! and is not undone if the run is later aborted.

use crate::context::CostCenterClient;
use crate::error::{Error, Result};
use crate::types::{
    CostCenterId, CostCenterSpec, CostCenterSpecs, Mode, ResolutionSource, ResolvedCostCenter,
    ResolvedCostCenters, Role,
};
use std::collections::HashMap;

/// Shipped example ids that must never reach the provider
pub const PLACEHOLDER_IDS: &[&str] = &[
    "CC-001-NO-PRUS",
    "CC-002-PRUS-ALLOWED",
    "REPLACE_WITH_NO_PRUS_COST_CENTER_ID",
    "REPLACE_WITH_PRUS_ALLOWED_COST_CENTER_ID",
];

/// Check if a configured id is a placeholder rather than a real id
pub fn is_placeholder(id: &str) -> bool {
    let id = id.trim();
    id.is_empty() || id.starts_with("REPLACE_WITH_") || PLACEHOLDER_IDS.contains(&id)
}

/// Resolves and memoizes cost center ids for one run
pub struct CostCenterResolver<'a> {
    client: &'a dyn CostCenterClient,
    mode: Mode,
    cache: HashMap<Role, ResolvedCostCenter>,
}

impl<'a> CostCenterResolver<'a> {
    pub fn new(client: &'a dyn CostCenterClient, mode: Mode) -> Self {
        Self {
            client,
            mode,
            cache: HashMap::new(),
        }
    }

    /// Resolve both roles
    ///
    /// `auto_create` widens each spec's own flag (command-line override).
    /// In plan mode nothing is created: a missing cost center resolves to a
    /// pending id, with a warning when it could not be created on apply either.
    pub fn resolve(
        &mut self,
        specs: &CostCenterSpecs,
        auto_create: bool,
    ) -> Result<ResolvedCostCenters> {
        Ok(ResolvedCostCenters {
            no_pru: self.resolve_role(&specs.no_pru, auto_create)?,
            pru_allowed: self.resolve_role(&specs.pru_allowed, auto_create)?,
        })
    }

    fn resolve_role(&mut self, spec: &CostCenterSpec, auto_create: bool) -> Result<ResolvedCostCenter> {
        if let Some(hit) = self.cache.get(&spec.role) {
            return Ok(hit.clone());
        }

        let resolved = self.lookup(spec, auto_create || spec.auto_create)?;
        log::info!(
            "{} cost center: {} ({:?})",
            spec.role,
            resolved.id,
            resolved.source
        );
        self.cache.insert(spec.role, resolved.clone());
        Ok(resolved)
    }

    fn lookup(&self, spec: &CostCenterSpec, auto_create: bool) -> Result<ResolvedCostCenter> {
        let resolved = |id: CostCenterId, source: ResolutionSource| ResolvedCostCenter {
            role: spec.role,
            id,
            display_name: spec.display_name.clone(),
            source,
        };

        if let Some(id) = spec.configured_id.as_deref()
            && !is_placeholder(id)
        {
            return Ok(resolved(
                CostCenterId::new(id.trim()),
                ResolutionSource::Configured,
            ));
        }

        let existing = self
            .client
            .find_by_name(&spec.display_name)
            .map_err(|e| Error::creation(&spec.display_name, e))?;
        if let Some(id) = existing {
            return Ok(resolved(id, ResolutionSource::Existing));
        }

        match (self.mode, auto_create) {
            (Mode::Apply, true) => {
                let id = self
                    .client
                    .create(&spec.display_name)
                    .map_err(|e| Error::creation(&spec.display_name, e))?;
                log::info!(
                    "Created cost center '{}' ({}); creation is kept even if the run aborts",
                    spec.display_name,
                    id
                );
                Ok(resolved(id, ResolutionSource::Created))
            }
            (Mode::Plan, true) => {
                log::info!(
                    "MODE=plan: would create cost center '{}'",
                    spec.display_name
                );
                Ok(resolved(
                    CostCenterId::pending(&spec.display_name),
                    ResolutionSource::WouldCreate,
                ))
            }
            (Mode::Plan, false) => {
                log::warn!(
                    "No cost center named '{}' and auto-create is off; apply would fail",
                    spec.display_name
                );
                Ok(resolved(
                    CostCenterId::pending(&spec.display_name),
                    ResolutionSource::Unresolved,
                ))
            }
            (Mode::Apply, false) => Err(Error::Configuration {
                role: spec.role,
                message: format!(
                    "no configured id and no active cost center named '{}'",
                    spec.display_name
                ),
            }),
        }
    }
}
