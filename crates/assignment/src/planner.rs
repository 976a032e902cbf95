//! Assignment planner - groups the roster by target cost center

use crate::policy::ExceptionSet;
use crate::types::{CostCenterId, ResolvedCostCenters, Role, Seat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Users bound for one cost center, in roster order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGroup {
    pub role: Role,
    pub cost_center_id: CostCenterId,
    pub usernames: Vec<String>,
}

impl PlanGroup {
    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }
}

/// Desired end state: one group per role, each username in exactly one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    /// Groups in role order (`NoPru`, then `PruAllowed`)
    pub groups: Vec<PlanGroup>,
}

impl AssignmentPlan {
    /// Total number of users in the plan
    pub fn total_users(&self) -> usize {
        self.groups.iter().map(PlanGroup::len).sum()
    }

    /// Check if the plan assigns nobody
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(PlanGroup::is_empty)
    }

    pub fn group(&self, role: Role) -> Option<&PlanGroup> {
        self.groups.iter().find(|g| g.role == role)
    }

    /// Groups that have at least one user
    pub fn non_empty_groups(&self) -> impl Iterator<Item = &PlanGroup> {
        self.groups.iter().filter(|g| !g.is_empty())
    }

    /// Find which group a user landed in
    pub fn cost_center_for(&self, username: &str) -> Option<&CostCenterId> {
        self.groups
            .iter()
            .find(|g| g.usernames.iter().any(|u| u == username))
            .map(|g| &g.cost_center_id)
    }
}

/// Compute the plan
///
/// Pure and deterministic: exception members go to the PRU-allowed cost
/// center, everyone else to the no-PRU one. Repeated usernames are planned
/// once, at their first position.
pub fn plan(roster: &[Seat], exceptions: &ExceptionSet, ids: &ResolvedCostCenters) -> AssignmentPlan {
    let mut groups: Vec<PlanGroup> = Role::ALL
        .iter()
        .map(|&role| PlanGroup {
            role,
            cost_center_id: ids.id(role).clone(),
            usernames: Vec::new(),
        })
        .collect();

    let mut seen: HashSet<&str> = HashSet::with_capacity(roster.len());
    for seat in roster {
        if !seen.insert(seat.username.as_str()) {
            continue;
        }
        let role = exceptions.role_for(&seat.username);
        log::debug!(
            "{} -> {} ({})",
            seat.username,
            ids.id(role),
            if role == Role::PruAllowed {
                "PRUs exception"
            } else {
                "default"
            }
        );
        groups[role.index()].usernames.push(seat.username.clone());
    }

    AssignmentPlan { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resolved, seat};

    fn group_names(plan: &AssignmentPlan, role: Role) -> Vec<&str> {
        plan.group(role)
            .unwrap()
            .usernames
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_policy_split() {
        let roster = vec![seat("alice", 1), seat("bob", 1), seat("carol", 1)];
        let plan = plan(&roster, &ExceptionSet::new(["bob"]), &resolved("NO_PRU_ID", "PRU_ALLOWED_ID"));

        assert_eq!(group_names(&plan, Role::NoPru), vec!["alice", "carol"]);
        assert_eq!(group_names(&plan, Role::PruAllowed), vec!["bob"]);
        assert_eq!(
            plan.group(Role::NoPru).unwrap().cost_center_id.as_str(),
            "NO_PRU_ID"
        );
        assert_eq!(
            plan.cost_center_for("bob").map(CostCenterId::as_str),
            Some("PRU_ALLOWED_ID")
        );
    }

    #[test]
    fn test_deterministic() {
        let roster: Vec<_> = (0..200).map(|i| seat(&format!("user{i}"), i)).collect();
        let exceptions = ExceptionSet::new(["user7", "user42", "user199"]);
        let ids = resolved("a", "b");

        assert_eq!(plan(&roster, &exceptions, &ids), plan(&roster, &exceptions, &ids));
    }

    #[test]
    fn test_partition_covers_roster_once() {
        let roster = vec![
            seat("u1", 1),
            seat("u2", 1),
            seat("u1", 2),
            seat("u3", 1),
            seat("u2", 3),
        ];
        let plan = plan(&roster, &ExceptionSet::new(["u2"]), &resolved("a", "b"));

        let mut all: Vec<&str> = plan
            .groups
            .iter()
            .flat_map(|g| g.usernames.iter().map(String::as_str))
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec!["u1", "u2", "u3"]);
        assert_eq!(plan.total_users(), 3);
    }

    #[test]
    fn test_exception_not_in_roster_is_ignored() {
        let roster = vec![seat("alice", 1)];
        let plan = plan(&roster, &ExceptionSet::new(["ghost"]), &resolved("a", "b"));

        assert!(plan.group(Role::PruAllowed).unwrap().is_empty());
        assert_eq!(plan.non_empty_groups().count(), 1);
    }

    #[test]
    fn test_empty_roster() {
        let plan = plan(&[], &ExceptionSet::default(), &resolved("a", "b"));
        assert!(plan.is_empty());
        assert_eq!(plan.groups.len(), 2);
    }
}
