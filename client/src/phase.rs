// SPDX-License-Identifier: MIT OR Apache-2.0

//! Match phase state machine and the affordances each phase allows

use phantomgo_core::{GameOutcome, Role};
use std::fmt;

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Resigned,
    Scored,
}

impl FinishReason {
    /// Derive the reason from a server outcome
    pub fn from_outcome(outcome: &GameOutcome) -> Self {
        if outcome.is_resignation() {
            FinishReason::Resigned
        } else {
            FinishReason::Scored
        }
    }
}

/// Phase of a match as seen by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Stones are being played
    Playing,
    /// Both players passed; dead groups are being marked
    Counting,
    /// Terminal
    Finished(FinishReason),
}

impl MatchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchPhase::Finished(_))
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPhase::Playing => f.write_str("playing"),
            MatchPhase::Counting => f.write_str("counting"),
            MatchPhase::Finished(FinishReason::Resigned) => f.write_str("finished (resignation)"),
            MatchPhase::Finished(FinishReason::Scored) => f.write_str("finished (scored)"),
        }
    }
}

/// Actions a user interface may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub place_stone: bool,
    pub pass: bool,
    pub undo: bool,
    pub resign: bool,
    pub edit_guesses: bool,
    pub select_groups: bool,
    pub request_score: bool,
    /// Navigation to the read-only results view
    pub view_results: bool,
}

impl Affordances {
    /// Everything a role could ever do, computed once per session
    pub fn for_role(role: Role) -> Self {
        let player = role.is_player();
        Self {
            place_stone: player,
            pass: player,
            undo: player,
            resign: player,
            edit_guesses: player,
            select_groups: player,
            request_score: true,
            view_results: true,
        }
    }

    fn for_phase(phase: MatchPhase) -> Self {
        match phase {
            MatchPhase::Playing => Self {
                place_stone: true,
                pass: true,
                undo: true,
                resign: true,
                edit_guesses: true,
                select_groups: false,
                request_score: false,
                view_results: false,
            },
            MatchPhase::Counting => Self {
                resign: true,
                select_groups: true,
                request_score: true,
                ..Self::default()
            },
            MatchPhase::Finished(_) => Self {
                view_results: true,
                ..Self::default()
            },
        }
    }

    fn intersect(self, other: Self) -> Self {
        Self {
            place_stone: self.place_stone && other.place_stone,
            pass: self.pass && other.pass,
            undo: self.undo && other.undo,
            resign: self.resign && other.resign,
            edit_guesses: self.edit_guesses && other.edit_guesses,
            select_groups: self.select_groups && other.select_groups,
            request_score: self.request_score && other.request_score,
            view_results: self.view_results && other.view_results,
        }
    }
}

/// A phase change observed on accepted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: MatchPhase,
    pub to: MatchPhase,
}

/// Playing → Counting → Finished, never backwards
#[derive(Debug, Clone)]
pub struct PhaseController {
    phase: MatchPhase,
    role_affordances: Affordances,
    controls_disabled: bool,
}

impl PhaseController {
    pub fn new(role: Role) -> Self {
        Self {
            phase: MatchPhase::Playing,
            role_affordances: Affordances::for_role(role),
            controls_disabled: false,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Feed the phase-relevant fields of an accepted snapshot
    pub fn observe(&mut self, counting: bool, winner: Option<&GameOutcome>) -> Option<PhaseTransition> {
        if let Some(outcome) = winner {
            return self.finish(FinishReason::from_outcome(outcome));
        }

        match (self.phase, counting) {
            (MatchPhase::Playing, true) => self.transition(MatchPhase::Counting),
            (MatchPhase::Counting, false) => {
                tracing::debug!("Ignoring snapshot that leaves counting");
                None
            }
            _ => None,
        }
    }

    /// Enter the terminal phase; a second call is a no-op
    pub fn finish(&mut self, reason: FinishReason) -> Option<PhaseTransition> {
        if self.phase.is_terminal() {
            return None;
        }
        self.transition(MatchPhase::Finished(reason))
    }

    fn transition(&mut self, to: MatchPhase) -> Option<PhaseTransition> {
        let from = self.phase;
        self.phase = to;
        tracing::info!(%from, %to, "Match phase changed");
        Some(PhaseTransition { from, to })
    }

    /// Latch off every match-mutating control.
    ///
    /// Returns `true` only for the call that actually flipped the latch.
    pub fn disable_match_controls(&mut self) -> bool {
        if self.controls_disabled {
            return false;
        }
        self.controls_disabled = true;
        true
    }

    pub fn controls_disabled(&self) -> bool {
        self.controls_disabled
    }

    /// What the UI may currently offer
    pub fn affordances(&self) -> Affordances {
        let current = self
            .role_affordances
            .intersect(Affordances::for_phase(self.phase));

        if self.controls_disabled {
            Affordances {
                view_results: current.view_results,
                ..Affordances::default()
            }
        } else {
            current
        }
    }
}
