// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speculative guess-stone buffer
//!
//! Guess stones change locally first and are confirmed with the server
//! afterwards. A color with unconfirmed edits is dirty; server lists never
//! overwrite a dirty color, so an in-flight edit cannot be reverted by a poll
//! that was answered before the server saw it. After confirmation the color
//! also ignores polls that were requested before the acknowledgement arrived.

use phantomgo_core::{Color, Coord};

/// Sequence number of a snapshot fetch, in the order the requests were issued
pub type FetchTicket = u64;

/// Full list of one color that still has to reach the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSync {
    pub color: Color,
    pub stones: Vec<Coord>,
    /// Local edit revision this list corresponds to
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
struct ColorBuffer {
    stones: Vec<Coord>,
    /// Bumped on every local edit
    revision: u64,
    /// Highest revision the server has acknowledged
    confirmed: u64,
    /// Last fetch issued before that acknowledgement arrived
    settled_after: FetchTicket,
}

impl ColorBuffer {
    fn is_dirty(&self) -> bool {
        self.revision != self.confirmed
    }

    fn pending(&self, color: Color) -> PendingSync {
        PendingSync {
            color,
            stones: self.stones.clone(),
            revision: self.revision,
        }
    }
}

/// Guess stones per color, local-first
#[derive(Debug, Clone, Default)]
pub struct GuessBuffer {
    black: ColorBuffer,
    white: ColorBuffer,
}

impl GuessBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self, color: Color) -> &ColorBuffer {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    fn buffer_mut(&mut self, color: Color) -> &mut ColorBuffer {
        match color {
            Color::Black => &mut self.black,
            Color::White => &mut self.white,
        }
    }

    pub fn stones(&self, color: Color) -> &[Coord] {
        &self.buffer(color).stones
    }

    pub fn contains(&self, color: Color, coord: Coord) -> bool {
        self.buffer(color).stones.contains(&coord)
    }

    pub fn is_dirty(&self, color: Color) -> bool {
        self.buffer(color).is_dirty()
    }

    /// Add a guess; returns the list to confirm, or `None` if already present
    pub fn add(&mut self, color: Color, coord: Coord) -> Option<PendingSync> {
        let buffer = self.buffer_mut(color);
        if buffer.stones.contains(&coord) {
            return None;
        }
        buffer.stones.push(coord);
        buffer.revision += 1;
        Some(buffer.pending(color))
    }

    /// Remove a guess; returns the list to confirm, or `None` if absent
    pub fn remove(&mut self, color: Color, coord: Coord) -> Option<PendingSync> {
        let buffer = self.buffer_mut(color);
        let idx = buffer.stones.iter().position(|c| *c == coord)?;
        buffer.stones.remove(idx);
        buffer.revision += 1;
        Some(buffer.pending(color))
    }

    /// Mark a revision as acknowledged by the server.
    ///
    /// `latest_fetch` is the newest fetch issued so far; polls up to it may
    /// predate the upload and are not allowed to replace this color.
    pub fn confirm(&mut self, color: Color, revision: u64, latest_fetch: FetchTicket) {
        let buffer = self.buffer_mut(color);
        buffer.confirmed = buffer.confirmed.max(revision.min(buffer.revision));
        buffer.settled_after = buffer.settled_after.max(latest_fetch);
    }

    /// Lists of every dirty color, for re-sending on the next poll
    pub fn pending(&self) -> Vec<PendingSync> {
        [Color::Black, Color::White]
            .into_iter()
            .filter(|color| self.is_dirty(*color))
            .map(|color| self.buffer(color).pending(color))
            .collect()
    }

    /// Replace a color with the server's list.
    ///
    /// The caller must already have accepted the generation carrying the list.
    /// Returns whether the visible list changed. Dirty colors are kept as they
    /// are, and so are colors confirmed after `fetch` was requested.
    pub fn replace_from_server(
        &mut self,
        color: Color,
        stones: Vec<Coord>,
        fetch: FetchTicket,
    ) -> bool {
        let buffer = self.buffer_mut(color);
        if buffer.is_dirty() {
            tracing::debug!(%color, "Keeping unconfirmed guess stones over server list");
            return false;
        }
        if fetch <= buffer.settled_after {
            tracing::debug!(%color, fetch, "Poll predates the guess confirmation");
            return false;
        }
        if buffer.stones == stones {
            return false;
        }
        buffer.stones = stones;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_produce_full_lists() {
        let mut buffer = GuessBuffer::new();
        let first = buffer.add(Color::White, Coord::new(3, 4)).unwrap();
        assert_eq!(first.stones, vec![Coord::new(3, 4)]);
        assert_eq!(first.revision, 1);

        let second = buffer.add(Color::White, Coord::new(5, 5)).unwrap();
        assert_eq!(second.stones.len(), 2);
        assert!(buffer.add(Color::White, Coord::new(5, 5)).is_none());

        let third = buffer.remove(Color::White, Coord::new(3, 4)).unwrap();
        assert_eq!(third.stones, vec![Coord::new(5, 5)]);
        assert!(buffer.remove(Color::White, Coord::new(3, 4)).is_none());
        assert!(buffer.stones(Color::Black).is_empty());
    }

    #[test]
    fn dirty_color_survives_server_list() {
        let mut buffer = GuessBuffer::new();
        buffer.add(Color::White, Coord::new(3, 4));

        assert!(!buffer.replace_from_server(Color::White, vec![], 1));
        assert_eq!(buffer.stones(Color::White), &[Coord::new(3, 4)]);
    }

    #[test]
    fn confirmed_color_takes_server_list() {
        let mut buffer = GuessBuffer::new();
        let pending = buffer.add(Color::White, Coord::new(3, 4)).unwrap();
        buffer.confirm(Color::White, pending.revision, 0);
        assert!(!buffer.is_dirty(Color::White));

        assert!(buffer.replace_from_server(Color::White, vec![Coord::new(0, 0)], 1));
        assert_eq!(buffer.stones(Color::White), &[Coord::new(0, 0)]);
    }

    #[test]
    fn poll_requested_before_confirmation_is_ignored() {
        let mut buffer = GuessBuffer::new();
        let pending = buffer.add(Color::Black, Coord::new(6, 6)).unwrap();
        // Fetch 4 was in flight when the upload was acknowledged
        buffer.confirm(Color::Black, pending.revision, 4);

        assert!(!buffer.replace_from_server(Color::Black, vec![], 4));
        assert_eq!(buffer.stones(Color::Black), &[Coord::new(6, 6)]);

        assert!(buffer.replace_from_server(Color::Black, vec![], 5));
        assert!(buffer.stones(Color::Black).is_empty());
    }

    #[test]
    fn stale_confirmation_keeps_newer_edit_dirty() {
        let mut buffer = GuessBuffer::new();
        let first = buffer.add(Color::Black, Coord::new(1, 1)).unwrap();
        buffer.add(Color::Black, Coord::new(2, 2));

        buffer.confirm(Color::Black, first.revision, 0);
        assert!(buffer.is_dirty(Color::Black));

        let pending = buffer.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].stones, vec![Coord::new(1, 1), Coord::new(2, 2)]);
    }
}
