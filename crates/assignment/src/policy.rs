//! Exception policy: which users may incur premium request overages

use crate::types::Role;
use std::collections::HashSet;

/// Ordered, duplicate-free set of exception usernames
///
/// Matching is case-sensitive and exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionSet {
    ordered: Vec<String>,
    lookup: HashSet<String>,
}

impl ExceptionSet {
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in usernames {
            let name = name.into();
            if set.lookup.insert(name.clone()) {
                set.ordered.push(name);
            }
        }
        set
    }

    pub fn contains(&self, username: &str) -> bool {
        self.lookup.contains(username)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    /// Target role for a username
    pub fn role_for(&self, username: &str) -> Role {
        if self.contains(username) {
            Role::PruAllowed
        } else {
            Role::NoPru
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_for() {
        let exceptions = ExceptionSet::new(["bob"]);
        assert_eq!(exceptions.role_for("bob"), Role::PruAllowed);
        assert_eq!(exceptions.role_for("alice"), Role::NoPru);
    }

    #[test]
    fn test_case_sensitive() {
        let exceptions = ExceptionSet::new(["Bob"]);
        assert_eq!(exceptions.role_for("bob"), Role::NoPru);
        assert_eq!(exceptions.role_for("Bob"), Role::PruAllowed);
    }

    #[test]
    fn test_dedup_keeps_first_order() {
        let exceptions = ExceptionSet::new(["carol", "bob", "carol", "alice"]);
        assert_eq!(exceptions.len(), 3);
        assert_eq!(
            exceptions.iter().collect::<Vec<_>>(),
            vec!["carol", "bob", "alice"]
        );
    }

    #[test]
    fn test_empty() {
        let exceptions = ExceptionSet::default();
        assert!(exceptions.is_empty());
        assert_eq!(exceptions.role_for("anyone"), Role::NoPru);
    }
}
