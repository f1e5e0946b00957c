// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local match state and the rules for merging server payloads into it
//!
//! Everything here is synchronous. The engine locks the state, calls one of
//! the `apply_*` methods with a decoded reply and publishes the returned
//! events after releasing the lock.

use crate::events::ClientEvent;
use crate::gateway::{Dimensions, GroupReply, GuessAck, PassAck};
use crate::generation::GenerationClock;
use crate::guess::{FetchTicket, GuessBuffer, PendingSync};
use crate::phase::{Affordances, MatchPhase, PhaseController};
use crate::selection::SelectionLedger;
use phantomgo_core::{BoardSnapshot, Color, Coord, Generation, Group, Role, SelectionEntry};

/// Which fields of a snapshot the server actually filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Full state from the sync fetch holding this ticket
    Poll(FetchTicket),
    /// Reply to a move, undo or resignation; guess lists and the
    /// selection are placeholders and must not be merged
    MoveReply,
}

/// What clicking a cell does while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuessMode {
    /// Clicks place real stones
    #[default]
    Off,
    /// Clicks on empty cells add guess stones
    Adding,
    /// Clicks on guess stones remove them
    Removing,
}

impl GuessMode {
    /// Next mode in the off → adding → removing cycle
    pub fn cycle(self) -> Self {
        match self {
            GuessMode::Off => GuessMode::Adding,
            GuessMode::Adding => GuessMode::Removing,
            GuessMode::Removing => GuessMode::Off,
        }
    }
}

#[derive(Debug)]
pub struct MatchClientState {
    role: Role,
    clock: GenerationClock,
    snapshot: Option<BoardSnapshot>,
    dimensions: Option<Dimensions>,
    guesses: GuessBuffer,
    ledger: SelectionLedger,
    phase: PhaseController,
    guess_mode: GuessMode,
    final_board_applied: bool,
    /// Fetches issued so far
    fetches_issued: FetchTicket,
    /// Last fetch issued before the newest group reply arrived
    selection_settled_after: FetchTicket,
}

impl MatchClientState {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            clock: GenerationClock::new(),
            snapshot: None,
            dimensions: None,
            guesses: GuessBuffer::new(),
            ledger: SelectionLedger::new(),
            phase: PhaseController::new(role),
            guess_mode: GuessMode::Off,
            final_board_applied: false,
            fetches_issued: 0,
            selection_settled_after: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn generation(&self) -> Option<Generation> {
        self.clock.current()
    }

    /// Generation to declare on outgoing requests
    pub fn declared_generation(&self) -> Generation {
        self.clock.declared()
    }

    pub fn snapshot(&self) -> Option<&BoardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase.phase()
    }

    pub fn affordances(&self) -> Affordances {
        self.phase.affordances()
    }

    pub fn guess_mode(&self) -> GuessMode {
        self.guess_mode
    }

    pub fn set_guess_mode(&mut self, mode: GuessMode) {
        self.guess_mode = mode;
    }

    pub fn guess_stones(&self, color: Color) -> &[Coord] {
        self.guesses.stones(color)
    }

    pub fn has_guess(&self, color: Color, coord: Coord) -> bool {
        self.guesses.contains(color, coord)
    }

    pub fn ledger(&self) -> &SelectionLedger {
        &self.ledger
    }

    pub fn dead_groups(&self) -> Vec<Group> {
        self.ledger.groups().cloned().collect()
    }

    /// Whether `coord` lies on the playable board, once its size is known
    pub fn contains(&self, coord: Coord) -> bool {
        match self.dimensions {
            Some(dims) => coord.is_within(dims.rows, dims.cols),
            None => self
                .snapshot
                .as_ref()
                .map(|s| coord.is_within(s.board.rows(), s.board.cols()))
                .unwrap_or(true),
        }
    }

    /// Whether the cell is free in the board this role sees
    pub fn is_cell_empty(&self, coord: Coord) -> bool {
        self.snapshot
            .as_ref()
            .map(|s| s.view_for(self.role).is_empty_at(coord))
            .unwrap_or(true)
    }

    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = Some(dimensions);
        if self.snapshot.is_none() {
            self.snapshot = Some(BoardSnapshot::empty(dimensions.rows, dimensions.cols, 0));
        }
    }

    pub fn add_guess(&mut self, color: Color, coord: Coord) -> Option<PendingSync> {
        self.guesses.add(color, coord)
    }

    pub fn remove_guess(&mut self, color: Color, coord: Coord) -> Option<PendingSync> {
        self.guesses.remove(color, coord)
    }

    /// Guess lists that still have to reach the server
    pub fn pending_guesses(&self) -> Vec<PendingSync> {
        self.guesses.pending()
    }

    /// Number the next snapshot fetch; call right before issuing it
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetches_issued += 1;
        self.fetches_issued
    }

    /// Rebuild the dead-group ledger from a poll, unless a group reply
    /// arrived after the poll was requested
    fn merge_polled_selection(
        &mut self,
        entries: &[SelectionEntry],
        fetch: FetchTicket,
    ) -> Vec<ClientEvent> {
        if fetch <= self.selection_settled_after {
            tracing::debug!(fetch, "Poll predates the last group reply");
            return Vec::new();
        }
        self.ledger
            .rebuild(entries.iter().cloned())
            .into_iter()
            .map(ClientEvent::SelectionChanged)
            .collect()
    }

    /// Merge a snapshot, returning the events it caused.
    ///
    /// Only snapshots newer than the clock are merged. The single exception
    /// is the first snapshot naming a winner: the server reports finished
    /// matches without a meaningful generation, so that snapshot is merged
    /// once as the final board even when it looks stale.
    ///
    /// Dead-group marks do not bump the server generation, so during
    /// counting a stale poll still contributes its selection.
    pub fn apply_snapshot(
        &mut self,
        snapshot: BoardSnapshot,
        source: SnapshotSource,
    ) -> Vec<ClientEvent> {
        let accepted = self.clock.accept(snapshot.generation);
        let final_pass = snapshot.winner.is_some() && !self.final_board_applied;

        if !accepted && !final_pass {
            return match source {
                SnapshotSource::Poll(fetch)
                    if snapshot.counting && self.phase.phase() == MatchPhase::Counting =>
                {
                    self.merge_polled_selection(&snapshot.selected_groups, fetch)
                }
                _ => Vec::new(),
            };
        }
        if snapshot.winner.is_some() {
            self.final_board_applied = true;
        }

        let mut events = Vec::new();
        let previous = self.snapshot.take();

        if let Some(prev) = &previous {
            if prev.captures != snapshot.captures {
                events.push(ClientEvent::CapturesUpdated(snapshot.captures));
            }
            if prev.turn != snapshot.turn {
                events.push(ClientEvent::TurnChanged(snapshot.turn));
            }
            if prev.stones_in_atari != snapshot.stones_in_atari {
                events.push(ClientEvent::AtariUpdated(snapshot.stones_in_atari));
            }
        } else {
            events.push(ClientEvent::CapturesUpdated(snapshot.captures));
            events.push(ClientEvent::TurnChanged(snapshot.turn));
            events.push(ClientEvent::AtariUpdated(snapshot.stones_in_atari));
        }

        if let SnapshotSource::Poll(fetch) = source {
            for color in [Color::Black, Color::White] {
                let stones = snapshot.guess_stones.for_color(color).to_vec();
                if self.guesses.replace_from_server(color, stones, fetch) {
                    events.push(ClientEvent::GuessStonesUpdated { color });
                }
            }

            if snapshot.counting || self.phase.phase() == MatchPhase::Counting {
                events.extend(self.merge_polled_selection(&snapshot.selected_groups, fetch));
            }
        }

        let transition = self
            .phase
            .observe(snapshot.counting, snapshot.winner.as_ref());

        tracing::debug!(
            generation = snapshot.generation,
            turn = %snapshot.turn,
            accepted,
            "Applied snapshot"
        );
        events.insert(
            0,
            ClientEvent::BoardUpdated {
                generation: snapshot.generation,
            },
        );
        self.snapshot = Some(snapshot);

        if let Some(t) = transition {
            events.push(ClientEvent::PhaseChanged {
                from: t.from,
                to: t.to,
            });
        }
        events.extend(self.latch_if_terminal());
        events
    }

    /// Merge a pass acknowledgement; it has no board, so only the immediate
    /// successor generation is taken
    pub fn apply_pass_ack(&mut self, ack: PassAck) -> Vec<ClientEvent> {
        let mut events = vec![ClientEvent::ServerMessage(ack.message.clone())];
        if !self.clock.accept_successor(ack.generation) {
            return events;
        }

        if let Some(current) = &self.snapshot {
            let mut next = current.clone();
            next.generation = ack.generation;
            next.counting = ack.counting;
            if next.turn != ack.turn {
                next.turn = ack.turn;
                events.push(ClientEvent::TurnChanged(ack.turn));
            }
            self.snapshot = Some(next);
        }

        if let Some(t) = self.phase.observe(ack.counting, None) {
            events.push(ClientEvent::PhaseChanged {
                from: t.from,
                to: t.to,
            });
        }
        events
    }

    /// Record a successful guess upload
    pub fn apply_guess_ack(&mut self, pending: &PendingSync, ack: &GuessAck) {
        self.guesses
            .confirm(pending.color, pending.revision, self.fetches_issued);
        if let Some(generation) = ack.generation {
            self.clock.accept_successor(generation);
        }
    }

    /// Merge a get-group reply.
    ///
    /// The reply answers this client's own toggle with the selection merged
    /// from both players, so it replaces the ledger whatever its generation.
    /// Polls requested before it arrived no longer touch the selection.
    pub fn apply_group_reply(&mut self, reply: GroupReply) -> Vec<ClientEvent> {
        if let Some(generation) = reply.generation {
            self.clock.accept(generation);
        }
        if let Some(group) = &reply.toggled {
            tracing::debug!(group = %group.key(), "Group toggled on server");
        }
        self.selection_settled_after = self.fetches_issued;

        self.ledger
            .rebuild(reply.selected)
            .into_iter()
            .map(ClientEvent::SelectionChanged)
            .collect()
    }

    /// End the match locally after a final score
    pub fn finish_scored(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if let Some(t) = self.phase.finish(crate::phase::FinishReason::Scored) {
            events.push(ClientEvent::PhaseChanged {
                from: t.from,
                to: t.to,
            });
        }
        events.extend(self.latch_if_terminal());
        events
    }

    fn latch_if_terminal(&mut self) -> Option<ClientEvent> {
        if self.phase.is_terminal() && self.phase.disable_match_controls() {
            tracing::info!("Match controls disabled");
            Some(ClientEvent::ControlsDisabled)
        } else {
            None
        }
    }

    /// Latch controls off without a phase change, e.g. when the session is lost
    pub fn disable_controls(&mut self) -> Option<ClientEvent> {
        self.phase
            .disable_match_controls()
            .then_some(ClientEvent::ControlsDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::FinishReason;
    use phantomgo_core::{GameOutcome, Turn};

    fn snapshot(generation: Generation) -> BoardSnapshot {
        BoardSnapshot::empty(9, 9, generation)
    }

    fn poll(state: &mut MatchClientState, snapshot: BoardSnapshot) -> Vec<ClientEvent> {
        let fetch = state.begin_fetch();
        state.apply_snapshot(snapshot, SnapshotSource::Poll(fetch))
    }

    fn counting(generation: Generation) -> BoardSnapshot {
        let mut snapshot = snapshot(generation);
        snapshot.counting = true;
        snapshot.turn = Turn::Counting;
        snapshot
    }

    fn group(coords: &[(usize, usize)]) -> Group {
        Group::new(coords.iter().map(|(r, c)| Coord::new(*r, *c)).collect()).unwrap()
    }

    #[test]
    fn tie_with_different_board_is_discarded() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(5));

        let mut other = snapshot(5);
        other.board.place(Coord::new(4, 4), Color::White);
        let events = poll(&mut state, other);

        assert!(events.is_empty());
        assert!(state.snapshot().unwrap().board.is_empty_at(Coord::new(4, 4)));
        assert_eq!(state.generation(), Some(5));
    }

    #[test]
    fn in_flight_guess_survives_older_poll() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(5));
        state.add_guess(Color::White, Coord::new(3, 4));

        // Same generation: stale
        poll(&mut state, snapshot(5));
        // Newer generation answered before the server saw the guess
        poll(&mut state, snapshot(6));

        assert_eq!(state.guess_stones(Color::White), &[Coord::new(3, 4)]);
    }

    #[test]
    fn move_reply_keeps_guesses_and_selection() {
        let mut state = MatchClientState::new(Role::White);
        let mut first = snapshot(1);
        first.guess_stones.black = vec![Coord::new(0, 0)];
        poll(&mut state, first);

        let events = state.apply_snapshot(snapshot(2), SnapshotSource::MoveReply);
        assert!(matches!(events[0], ClientEvent::BoardUpdated { generation: 2 }));
        assert_eq!(state.guess_stones(Color::Black), &[Coord::new(0, 0)]);
    }

    #[test]
    fn counting_snapshot_moves_phase_and_disables_play() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(3));

        let mut counting = snapshot(4);
        counting.counting = true;
        counting.turn = Turn::Counting;
        let events = poll(&mut state, counting);

        assert!(events.contains(&ClientEvent::PhaseChanged {
            from: MatchPhase::Playing,
            to: MatchPhase::Counting
        }));
        assert!(!state.affordances().place_stone);
        assert!(state.affordances().select_groups);
    }

    #[test]
    fn stale_winner_snapshot_is_merged_once() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(10));

        let mut finished = snapshot(0);
        finished.winner = Some(GameOutcome::parse("White + R"));
        let events = poll(&mut state, finished.clone());

        assert_eq!(state.phase(), MatchPhase::Finished(FinishReason::Resigned));
        assert!(events.contains(&ClientEvent::ControlsDisabled));
        assert_eq!(state.generation(), Some(10));

        assert!(poll(&mut state, finished).is_empty());
    }

    #[test]
    fn pass_ack_only_takes_successor() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(7));

        let skipped = state.apply_pass_ack(PassAck {
            generation: 9,
            turn: Turn::Counting,
            counting: true,
            message: "Both players passed. Game over!".into(),
        });
        assert_eq!(skipped.len(), 1);
        assert_eq!(state.generation(), Some(7));

        let events = state.apply_pass_ack(PassAck {
            generation: 8,
            turn: Turn::Counting,
            counting: true,
            message: "Both players passed. Game over!".into(),
        });
        assert_eq!(state.generation(), Some(8));
        assert_eq!(state.phase(), MatchPhase::Counting);
        assert!(events.contains(&ClientEvent::TurnChanged(Turn::Counting)));
    }

    #[test]
    fn group_reply_replaces_ledger_with_merged_selection() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, counting(8));
        let mine = group(&[(0, 0)]);
        let theirs = group(&[(5, 5)]);

        let events = state.apply_group_reply(GroupReply {
            toggled: Some(mine.clone()),
            selected: vec![
                SelectionEntry::Group(theirs.clone()),
                SelectionEntry::Group(mine.clone()),
            ],
            generation: None,
        });
        assert_eq!(events.len(), 2);
        assert!(state.ledger().is_dead(&theirs.key()));
        assert!(state.ledger().is_dead(&mine.key()));

        // Untoggling leaves only the other player's mark
        state.apply_group_reply(GroupReply {
            toggled: Some(mine.clone()),
            selected: vec![SelectionEntry::Group(theirs.clone())],
            generation: None,
        });
        assert_eq!(state.dead_groups(), vec![theirs]);
    }

    #[test]
    fn counting_poll_at_same_generation_brings_peer_marks() {
        let mut state = MatchClientState::new(Role::White);
        poll(&mut state, counting(8));
        let theirs = group(&[(5, 5)]);

        let mut marked = counting(8);
        marked.selected_groups = vec![SelectionEntry::NoOp, SelectionEntry::Group(theirs.clone())];
        let events = poll(&mut state, marked);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ClientEvent::SelectionChanged(_)));
        assert_eq!(state.dead_groups(), vec![theirs]);
        assert_eq!(state.generation(), Some(8));
    }

    #[test]
    fn poll_requested_before_group_reply_keeps_the_reply() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, counting(8));
        let mine = group(&[(0, 0)]);

        // The poll goes out, then the toggle is answered, then the poll lands
        let fetch = state.begin_fetch();
        state.apply_group_reply(GroupReply {
            toggled: Some(mine.clone()),
            selected: vec![SelectionEntry::Group(mine.clone())],
            generation: None,
        });
        let events = state.apply_snapshot(counting(8), SnapshotSource::Poll(fetch));

        assert!(events.is_empty());
        assert_eq!(state.dead_groups(), vec![mine]);
    }

    #[test]
    fn pass_ack_replaces_the_snapshot() {
        let mut state = MatchClientState::new(Role::White);
        poll(&mut state, snapshot(2));
        let before = state.snapshot().cloned().unwrap();

        state.apply_pass_ack(PassAck {
            generation: 3,
            turn: Turn::Player(Color::Black),
            counting: false,
            message: "Player White passed".into(),
        });

        let after = state.snapshot().unwrap();
        assert_eq!(before.generation, 2);
        assert_eq!(after.generation, 3);
        assert_eq!(after.turn, Turn::Player(Color::Black));
        assert_eq!(after.board, before.board);
    }

    #[test]
    fn guess_poll_requested_before_the_ack_is_ignored() {
        let mut state = MatchClientState::new(Role::Black);
        poll(&mut state, snapshot(5));
        let pending = state.add_guess(Color::White, Coord::new(3, 4)).unwrap();

        // Poll issued before the upload lands, answered after the opponent moved
        let fetch = state.begin_fetch();
        state.apply_guess_ack(
            &pending,
            &GuessAck {
                message: "Stones synced".into(),
                generation: None,
            },
        );
        state.apply_snapshot(snapshot(6), SnapshotSource::Poll(fetch));
        assert_eq!(state.guess_stones(Color::White), &[Coord::new(3, 4)]);

        // A poll requested afterwards is authoritative again
        poll(&mut state, snapshot(7));
        assert!(state.guess_stones(Color::White).is_empty());
    }
}
