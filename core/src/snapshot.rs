// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative match state as received from the server

use crate::{Board, Color, Coord, GameError, GameOutcome, Generation, Role, SelectionEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whose move it is, or which non-playing stage the match is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// The given color is to move
    Player(Color),
    /// Both players passed; dead groups are being marked
    Counting,
    /// The match is over
    Finished,
}

impl FromStr for Turn {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counting" => Ok(Turn::Counting),
            "finished" => Ok(Turn::Finished),
            other => other
                .parse::<Color>()
                .map(Turn::Player)
                .map_err(|_| GameError::UnknownTurn(other.to_string())),
        }
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Turn::Player(color) => write!(f, "{}", color),
            Turn::Counting => f.write_str("counting"),
            Turn::Finished => f.write_str("finished"),
        }
    }
}

/// Number of stones captured by each color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Captures {
    pub black: i64,
    pub white: i64,
}

/// Number of stones in atari for each color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StonesInAtari {
    pub black: usize,
    pub white: usize,
}

/// Which players have asked for the final count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadyToCount {
    pub black: bool,
    pub white: bool,
}

/// Guess stones recorded by the server, keyed by the guessed stone color
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuessLists {
    pub black: Vec<Coord>,
    pub white: Vec<Coord>,
}

impl GuessLists {
    pub fn for_color(&self, color: Color) -> &[Coord] {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }
}

/// A complete revision of the match; replaced wholesale, never patched
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    /// Revision this snapshot describes
    pub generation: Generation,
    /// Server message accompanying the snapshot
    pub message: String,
    /// Public board
    pub board: Board,
    /// Board as seen by the black player
    pub black_view: Board,
    /// Board as seen by the white player
    pub white_view: Board,
    pub turn: Turn,
    pub captures: Captures,
    pub stones_in_atari: StonesInAtari,
    pub guess_stones: GuessLists,
    pub counting: bool,
    pub winner: Option<GameOutcome>,
    pub rejoin_required: bool,
    /// Dead-group choices merged from both players
    pub selected_groups: Vec<SelectionEntry>,
    pub ready_to_count: ReadyToCount,
}

impl BoardSnapshot {
    /// An empty snapshot of the given size, useful as a starting point
    pub fn empty(rows: usize, cols: usize, generation: Generation) -> Self {
        let board = Board::new(rows, cols);
        Self {
            generation,
            message: String::new(),
            black_view: board.clone(),
            white_view: board.clone(),
            board,
            turn: Turn::Player(Color::Black),
            captures: Captures::default(),
            stones_in_atari: StonesInAtari::default(),
            guess_stones: GuessLists::default(),
            counting: false,
            winner: None,
            rejoin_required: false,
            selected_groups: Vec::new(),
            ready_to_count: ReadyToCount::default(),
        }
    }

    /// The board this role is allowed to see; falls back to the public board
    pub fn view_for(&self, role: Role) -> &Board {
        let view = match role {
            Role::Black => &self.black_view,
            Role::White => &self.white_view,
            Role::Spectator => &self.board,
        };
        if view.is_blank() {
            &self.board
        } else {
            view
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_parses_sentinels() {
        assert_eq!("counting".parse::<Turn>(), Ok(Turn::Counting));
        assert_eq!("black".parse::<Turn>(), Ok(Turn::Player(Color::Black)));
        assert!(matches!("nobody".parse::<Turn>(), Err(GameError::UnknownTurn(_))));
    }

    #[test]
    fn view_falls_back_to_public_board() {
        let mut snapshot = BoardSnapshot::empty(9, 9, 0);
        snapshot.white_view = Board::default();
        snapshot.board.place(Coord::new(0, 0), Color::Black);

        assert_eq!(snapshot.view_for(Role::White), &snapshot.board);
        assert_eq!(snapshot.view_for(Role::Black).count_stones_for(Color::Black), 0);
    }
}
