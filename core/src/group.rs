// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stone groups and their canonical keys

use crate::{Coord, GameError};
use std::fmt;

/// A connected set of same-colored stones, stored in sorted order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group {
    members: Vec<Coord>,
}

impl Group {
    /// Build a group from its member coordinates in any order
    pub fn new(mut members: Vec<Coord>) -> Result<Self, GameError> {
        if members.is_empty() {
            return Err(GameError::EmptyGroup);
        }
        members.sort_unstable();
        members.dedup();
        Ok(Self { members })
    }

    pub fn members(&self) -> &[Coord] {
        &self.members
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.members.binary_search(&coord).is_ok()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Canonical key; equal for any ordering of the same members
    pub fn key(&self) -> GroupKey {
        let key = self
            .members
            .iter()
            .map(Coord::to_string)
            .collect::<Vec<_>>()
            .join(";");
        GroupKey(key)
    }
}

/// Canonical serialization of a group's sorted member coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a server-provided selection list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEntry {
    /// A real group chosen by one of the players
    Group(Group),
    /// Padding from the server's merge of both players' choices
    NoOp,
}

impl SelectionEntry {
    pub fn group(&self) -> Option<&Group> {
        match self {
            SelectionEntry::Group(group) => Some(group),
            SelectionEntry::NoOp => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let a = Group::new(vec![Coord::new(3, 4), Coord::new(2, 4), Coord::new(3, 5)]).unwrap();
        let b = Group::new(vec![Coord::new(3, 5), Coord::new(3, 4), Coord::new(2, 4)]).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "2,4;3,4;3,5");
    }

    #[test]
    fn duplicates_collapse() {
        let g = Group::new(vec![Coord::new(1, 1), Coord::new(1, 1)]).unwrap();
        assert_eq!(g.len(), 1);
        assert!(g.contains(Coord::new(1, 1)));
        assert!(!g.contains(Coord::new(1, 2)));
    }

    #[test]
    fn empty_group_is_rejected() {
        assert_eq!(Group::new(vec![]), Err(GameError::EmptyGroup));
    }
}
