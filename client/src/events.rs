// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifications published to user interfaces

use crate::phase::MatchPhase;
use crate::selection::SelectionChange;
use crate::sync::SyncExit;
use phantomgo_core::{Captures, Color, GameOutcome, Generation, StonesInAtari, Turn};

/// Something the UI should redraw or report
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A newer board was applied
    BoardUpdated {
        /// Generation of the applied board
        generation: Generation,
    },
    /// The visible guess stones of one color changed
    GuessStonesUpdated {
        /// Color of the guessed stones
        color: Color,
    },
    CapturesUpdated(Captures),
    TurnChanged(Turn),
    AtariUpdated(StonesInAtari),
    /// A dead-group mark flipped
    SelectionChanged(SelectionChange),
    PhaseChanged {
        from: MatchPhase,
        to: MatchPhase,
    },
    /// Match-mutating controls are permanently off
    ControlsDisabled,
    /// The server refused an action for turn-order reasons
    Rejected {
        /// Server message
        message: String,
    },
    ServerMessage(String),
    /// The score call is waiting for the other player
    ScorePending,
    ScoreResult {
        /// Result descriptor as sent by the server
        descriptor: String,
        outcome: GameOutcome,
    },
    /// The sync loop stopped for good
    SyncHalted(SyncExit),
}
