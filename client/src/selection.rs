// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-group selection ledger used during counting

use phantomgo_core::{Coord, Group, GroupKey, SelectionEntry};
use std::collections::BTreeMap;

/// Result of flipping one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub key: GroupKey,
    pub group: Group,
    /// `true` when the group is now marked dead (rendered transparent);
    /// `false` when it is alive again and keeps its own stone color
    pub dead: bool,
}

/// Groups currently marked dead, keyed canonically
#[derive(Debug, Clone, Default)]
pub struct SelectionLedger {
    dead: BTreeMap<GroupKey, Group>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a group between dead and alive
    pub fn toggle(&mut self, group: &Group) -> SelectionChange {
        let key = group.key();
        let dead = if self.dead.remove(&key).is_some() {
            false
        } else {
            self.dead.insert(key.clone(), group.clone());
            true
        };

        SelectionChange {
            key,
            group: group.clone(),
            dead,
        }
    }

    /// Replace the ledger with a server-provided list, returning the groups that flipped.
    ///
    /// Padding entries are skipped.
    pub fn rebuild<I>(&mut self, entries: I) -> Vec<SelectionChange>
    where
        I: IntoIterator<Item = SelectionEntry>,
    {
        let incoming: BTreeMap<GroupKey, Group> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                SelectionEntry::Group(group) => Some((group.key(), group)),
                SelectionEntry::NoOp => None,
            })
            .collect();

        let revived = self
            .dead
            .iter()
            .filter(|(key, _)| !incoming.contains_key(*key))
            .map(|(key, group)| SelectionChange {
                key: key.clone(),
                group: group.clone(),
                dead: false,
            });
        let killed = incoming
            .iter()
            .filter(|(key, _)| !self.dead.contains_key(*key))
            .map(|(key, group)| SelectionChange {
                key: key.clone(),
                group: group.clone(),
                dead: true,
            });
        let changes: Vec<_> = revived.chain(killed).collect();

        self.dead = incoming;
        changes
    }

    pub fn is_dead(&self, key: &GroupKey) -> bool {
        self.dead.contains_key(key)
    }

    /// Whether the stone at `coord` belongs to a group marked dead
    pub fn covers(&self, coord: Coord) -> bool {
        self.dead.values().any(|group| group.contains(coord))
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.dead.values()
    }

    pub fn len(&self) -> usize {
        self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dead.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(coords: &[(usize, usize)]) -> Group {
        Group::new(coords.iter().map(|(r, c)| Coord::new(*r, *c)).collect()).unwrap()
    }

    #[test]
    fn double_toggle_restores_membership() {
        let mut ledger = SelectionLedger::new();
        let g = group(&[(2, 2), (2, 3)]);

        let first = ledger.toggle(&g);
        assert!(first.dead);
        assert!(ledger.is_dead(&g.key()));
        assert!(ledger.covers(Coord::new(2, 3)));

        let second = ledger.toggle(&g);
        assert!(!second.dead);
        assert!(ledger.is_empty());
    }

    #[test]
    fn toggle_matches_reordered_group() {
        let mut ledger = SelectionLedger::new();
        ledger.toggle(&group(&[(2, 3), (2, 2)]));
        let change = ledger.toggle(&group(&[(2, 2), (2, 3)]));
        assert!(!change.dead);
        assert!(ledger.is_empty());
    }

    #[test]
    fn rebuild_skips_padding() {
        let mut ledger = SelectionLedger::new();
        let g = group(&[(0, 0)]);
        ledger.toggle(&g);

        let changes = ledger.rebuild(vec![SelectionEntry::NoOp, SelectionEntry::Group(g.clone())]);
        assert!(changes.is_empty());
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_dead(&g.key()));
    }

    #[test]
    fn rebuild_reports_flips_both_ways() {
        let mut ledger = SelectionLedger::new();
        let mine = group(&[(1, 1)]);
        let theirs = group(&[(5, 5), (5, 6)]);
        ledger.toggle(&mine);

        let changes = ledger.rebuild(vec![SelectionEntry::Group(theirs.clone())]);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|c| c.key == mine.key() && !c.dead));
        assert!(changes.iter().any(|c| c.key == theirs.key() && c.dead));
        assert!(!ledger.is_dead(&mine.key()));
    }
}
