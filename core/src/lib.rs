// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phantom Go Core - match types shared by the client crates
//!
//! This crate provides the value types the match client reasons about:
//! - Stone colors, cell states and board coordinates
//! - Player roles (black, white, spectator)
//! - Board snapshots received from the match server
//! - Stone groups and their canonical keys for dead-group selection
//! - Game outcomes reported when a match ends

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod board;
pub mod group;
pub mod outcome;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use board::Board;
pub use group::{Group, GroupKey, SelectionEntry};
pub use outcome::GameOutcome;
pub use snapshot::{BoardSnapshot, Captures, GuessLists, ReadyToCount, StonesInAtari, Turn};

/// Revision number of the shared match state, assigned by the server.
pub type Generation = u64;

/// Stone color in a Go game (Black or White)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Black player (traditionally goes first)
    Black,
    /// White player
    White,
}

impl Color {
    /// Returns the opposite color
    pub fn opposite(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(Color::Black),
            "white" => Ok(Color::White),
            other => Err(GameError::UnknownColor(other.to_string())),
        }
    }
}

/// State of a single intersection as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    /// No stone
    #[default]
    Empty,
    /// Black stone
    Black,
    /// White stone
    White,
    /// Off-board marker
    Invalid,
}

impl CellState {
    /// The stone color on this cell, if any
    pub fn stone(&self) -> Option<Color> {
        match self {
            CellState::Black => Some(Color::Black),
            CellState::White => Some(Color::White),
            CellState::Empty | CellState::Invalid => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellState::Empty)
    }
}

impl From<Color> for CellState {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => CellState::Black,
            Color::White => CellState::White,
        }
    }
}

/// Board coordinate, zero-based from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if coordinate is inside a board of the given dimensions
    pub fn is_within(&self, rows: usize, cols: usize) -> bool {
        self.row < rows && self.col < cols
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Which seat a client occupies in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Seated as the black player
    Black,
    /// Seated as the white player
    White,
    /// Watching only
    Spectator,
}

impl Role {
    /// Stone color played by this role
    pub fn color(&self) -> Option<Color> {
        match self {
            Role::Black => Some(Color::Black),
            Role::White => Some(Color::White),
            Role::Spectator => None,
        }
    }

    /// Color whose hidden stones this role may hypothesize about
    pub fn guess_color(&self) -> Option<Color> {
        self.color().map(|c| c.opposite())
    }

    pub fn is_player(&self) -> bool {
        !matches!(self, Role::Spectator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Black => "black",
            Role::White => "white",
            Role::Spectator => "spectator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(Role::Black),
            "white" => Ok(Role::White),
            "spectator" | "main" => Ok(Role::Spectator),
            other => Err(GameError::UnknownRole(other.to_string())),
        }
    }
}

/// Errors raised while interpreting match data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The coordinate is outside the board
    #[error("Invalid coordinate {0}")]
    InvalidCoordinate(Coord),

    /// Board rows have differing lengths
    #[error("Board is not rectangular: row {row} has {found} cells, expected {expected}")]
    RaggedBoard {
        /// Offending row
        row: usize,
        /// Cells found in that row
        found: usize,
        /// Cells in the first row
        expected: usize,
    },

    /// Unknown color name
    #[error("Unknown color: {0}")]
    UnknownColor(String),

    /// Unknown role name
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Unknown turn descriptor
    #[error("Unknown turn: {0}")]
    UnknownTurn(String),

    /// A group with no stones
    #[error("Group has no stones")]
    EmptyGroup,
}
