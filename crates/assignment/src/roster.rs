//! Roster fetch: list, deduplicate and filter seats

use crate::context::SeatSource;
use crate::error::{Error, Result};
use crate::types::Seat;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Max duplicate logins named in the warning
const DUPLICATE_SAMPLE: usize = 10;

/// Deduplicated, filtered seats ready for planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Seats in provider order, one per username
    pub seats: Vec<Seat>,
    /// Raw entries returned by the seat source
    pub total_listed: usize,
    /// Entries dropped because their username was already seen
    pub duplicates_skipped: usize,
    /// Requested usernames absent from the roster
    pub missing_requested: Vec<String>,
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }
}

/// Fetch the roster
///
/// Deduplication runs over the full listing, then the incremental `since`
/// filter (strictly greater-than), then the explicit user filter. An empty
/// result is not an error.
pub fn fetch(
    source: &dyn SeatSource,
    filter_users: Option<&[String]>,
    since: Option<DateTime<Utc>>,
) -> Result<Roster> {
    let listed = source.list_seats().map_err(Error::upstream)?;
    let total_listed = listed.len();
    log::info!("Found {} Copilot seats", total_listed);

    let (unique, duplicates_skipped) = dedup(listed);

    let missing_requested = match filter_users {
        Some(requested) => {
            let present: HashSet<&str> = unique.iter().map(|s| s.username.as_str()).collect();
            let mut seen = HashSet::new();
            requested
                .iter()
                .filter(|u| !present.contains(u.as_str()) && seen.insert(u.as_str()))
                .cloned()
                .collect()
        }
        None => Vec::new(),
    };
    for user in &missing_requested {
        log::warn!("Requested user {} has no Copilot seat; skipping", user);
    }

    let mut seats = unique;
    if let Some(since) = since {
        let before = seats.len();
        seats.retain(|seat| is_newer(seat, since));
        log::info!(
            "Incremental: {} of {} seats created after {}",
            seats.len(),
            before,
            since.to_rfc3339()
        );
    }

    if let Some(requested) = filter_users {
        let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
        seats.retain(|seat| wanted.contains(seat.username.as_str()));
        log::info!("Filtered to {} requested users", seats.len());
    }

    Ok(Roster {
        seats,
        total_listed,
        duplicates_skipped,
        missing_requested,
    })
}

/// Keep the first seat per username; count the rest
fn dedup(listed: Vec<Seat>) -> (Vec<Seat>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(listed.len());
    let mut unique = Vec::with_capacity(listed.len());
    let mut dup_order: Vec<String> = Vec::new();
    let mut dup_counts: HashMap<String, usize> = HashMap::new();

    for seat in listed {
        if seat.username.is_empty() {
            log::warn!("Skipping seat without a login");
            continue;
        }
        if seen.contains(&seat.username) {
            let count = dup_counts.entry(seat.username.clone()).or_insert(0);
            if *count == 0 {
                dup_order.push(seat.username.clone());
            }
            *count += 1;
            continue;
        }
        seen.insert(seat.username.clone());
        unique.push(seat);
    }

    let total: usize = dup_counts.values().sum();
    if total > 0 {
        let mut sample = dup_order
            .iter()
            .take(DUPLICATE_SAMPLE)
            .map(|login| format!("{} (+{})", login, dup_counts[login]))
            .collect::<Vec<_>>()
            .join(", ");
        if dup_order.len() > DUPLICATE_SAMPLE {
            sample.push_str(", ...");
        }
        log::warn!(
            "Skipped {} duplicate seat entries across {} users: {}",
            total,
            dup_order.len(),
            sample
        );
    }

    (unique, total)
}

/// Seats with an unknown creation time are always included
fn is_newer(seat: &Seat, since: DateTime<Utc>) -> bool {
    match seat.created_at {
        Some(created) => created > since,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSeats, StaticSeats, seat, t};
    use chrono::Duration;

    fn names(roster: &Roster) -> Vec<&str> {
        roster.seats.iter().map(|s| s.username.as_str()).collect()
    }

    #[test]
    fn test_dedup_keeps_first() {
        let source = StaticSeats(vec![
            seat("alice", 1),
            seat("bob", 1),
            seat("alice", 2),
        ]);
        let roster = fetch(&source, None, None).unwrap();
        assert_eq!(names(&roster), vec!["alice", "bob"]);
        assert_eq!(roster.seats[0].created_at, Some(t(1)));
        assert_eq!(roster.duplicates_skipped, 1);
        assert_eq!(roster.total_listed, 3);
    }

    #[test]
    fn test_since_is_strict() {
        let since = t(10);
        let source = StaticSeats(vec![
            Seat::new("on_the_mark", Some(since)),
            Seat::new("just_after", Some(since + Duration::milliseconds(1))),
            Seat::new("before", Some(since - Duration::seconds(1))),
        ]);
        let roster = fetch(&source, None, Some(since)).unwrap();
        assert_eq!(names(&roster), vec!["just_after"]);
    }

    #[test]
    fn test_since_includes_unknown_creation() {
        let source = StaticSeats(vec![Seat::new("mystery", None), seat("old", 1)]);
        let roster = fetch(&source, None, Some(t(5))).unwrap();
        assert_eq!(names(&roster), vec!["mystery"]);
    }

    #[test]
    fn test_duplicates_counted_before_since_filter() {
        let source = StaticSeats(vec![seat("alice", 1), seat("alice", 20)]);
        let roster = fetch(&source, None, Some(t(5))).unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.duplicates_skipped, 1);
    }

    #[test]
    fn test_filter_users_intersection_and_missing() {
        let source = StaticSeats(vec![seat("alice", 1), seat("bob", 1), seat("carol", 1)]);
        let requested = vec!["carol".to_string(), "zed".to_string(), "alice".to_string()];
        let roster = fetch(&source, Some(&requested), None).unwrap();
        // roster order, not request order
        assert_eq!(names(&roster), vec!["alice", "carol"]);
        assert_eq!(roster.missing_requested, vec!["zed".to_string()]);
    }

    #[test]
    fn test_empty_is_not_error() {
        let roster = fetch(&StaticSeats(vec![]), None, None).unwrap();
        assert!(roster.is_empty());
        assert_eq!(roster.duplicates_skipped, 0);
    }

    #[test]
    fn test_skips_blank_login() {
        let source = StaticSeats(vec![seat("", 1), seat("alice", 1)]);
        let roster = fetch(&source, None, None).unwrap();
        assert_eq!(names(&roster), vec!["alice"]);
        assert_eq!(roster.duplicates_skipped, 0);
    }

    #[test]
    fn test_upstream_error() {
        let err = fetch(&FailingSeats, None, None).unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
    }
}
