// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON bodies exchanged with the match server and their domain conversions
//!
//! Group coordinates are 1-based on the wire (the server's board carries a
//! sentinel border) and groups containing row 100 are padding.

use super::{Dimensions, GatewayError, GroupReply, GuessAck, PassAck, Rejection, ScoreReply, UpdateCheck};
use phantomgo_core::{
    Board, BoardSnapshot, Captures, CellState, Color, Coord, GameOutcome, Generation, Group,
    GuessLists, ReadyToCount, Role, SelectionEntry, StonesInAtari, Turn,
};
use serde::{Deserialize, Serialize};

/// Row used by the server to pad selection lists
pub const SENTINEL_ROW: usize = 100;

/// Text returned by the score call until both players agreed
pub const WAITING_FOR_OTHER_PLAYER: &str = "Waiting for other player";

const NOT_YOUR_TURN_PREFIX: &str = "It's not your turn";

/// Name the server uses for a role in `player` fields
pub fn player_name(role: Role) -> &'static str {
    role.as_str()
}

/// Recognize a turn-order rejection hidden in a success message
pub fn rejection_from_message(message: &str) -> Option<Rejection> {
    message
        .starts_with(NOT_YOUR_TURN_PREFIX)
        .then(|| Rejection::NotYourTurn(message.to_string()))
}

// Requests

#[derive(Debug, Serialize)]
pub struct MatchRequest<'a> {
    pub match_string: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CellClickRequest<'a> {
    pub row: usize,
    pub col: usize,
    pub match_string: &'a str,
    pub session_token: &'a str,
    pub board_generation_number: Generation,
}

#[derive(Debug, Serialize)]
pub struct GuessStonesRequest<'a> {
    pub color: &'a str,
    pub stones: Vec<[usize; 2]>,
    pub match_string: &'a str,
    pub board_generation_number: Generation,
}

impl<'a> GuessStonesRequest<'a> {
    pub fn new(match_string: &'a str, color: Color, stones: &[Coord], generation: Generation) -> Self {
        Self {
            color: color.as_str(),
            stones: stones.iter().map(|c| [c.row, c.col]).collect(),
            match_string,
            board_generation_number: generation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetGroupRequest<'a> {
    pub row: usize,
    pub col: usize,
    pub match_string: &'a str,
    pub session_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GetScoreRequest<'a> {
    pub match_string: &'a str,
    pub session_token: &'a str,
    pub groups_to_remove: Vec<Vec<WireLoc>>,
}

impl<'a> GetScoreRequest<'a> {
    pub fn new(match_string: &'a str, session_token: &'a str, dead_groups: &[Group]) -> Self {
        Self {
            match_string,
            session_token,
            groups_to_remove: dead_groups
                .iter()
                .map(|g| g.members().iter().map(|c| WireLoc::from_coord(*c)).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShouldSyncRequest<'a> {
    pub match_string: &'a str,
    pub player: &'a str,
    pub frontend_board_generation_number: Generation,
}

#[derive(Debug, Serialize)]
pub struct PlayerRequest<'a> {
    pub match_string: &'a str,
    pub player: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UndoRequest<'a> {
    pub match_string: &'a str,
    pub player: &'a str,
    pub board_generation_number: Generation,
}

// Responses

/// 1-based board location as the server stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLoc {
    pub row: usize,
    pub col: usize,
}

impl WireLoc {
    pub fn from_coord(coord: Coord) -> Self {
        Self {
            row: coord.row + 1,
            col: coord.col + 1,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.row == SENTINEL_ROW
    }

    pub fn to_coord(self) -> Result<Coord, GatewayError> {
        match (self.row.checked_sub(1), self.col.checked_sub(1)) {
            (Some(row), Some(col)) => Ok(Coord::new(row, col)),
            _ => Err(GatewayError::Decode(format!(
                "location ({}, {}) lies on the border",
                self.row, self.col
            ))),
        }
    }
}

/// Decode one wire group, mapping padding to [`SelectionEntry::NoOp`]
pub fn decode_group(locs: &[WireLoc]) -> Result<SelectionEntry, GatewayError> {
    if locs.is_empty() || locs.iter().any(WireLoc::is_sentinel) {
        return Ok(SelectionEntry::NoOp);
    }
    let members = locs
        .iter()
        .map(|loc| loc.to_coord())
        .collect::<Result<Vec<_>, _>>()?;
    Group::new(members)
        .map(SelectionEntry::Group)
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct DimensionsPayload {
    pub rows: usize,
    pub cols: usize,
}

impl From<DimensionsPayload> for Dimensions {
    fn from(payload: DimensionsPayload) -> Self {
        Self {
            rows: payload.rows,
            cols: payload.cols,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupsToRemovePayload {
    pub selected: Vec<Vec<WireLoc>>,
    pub toggle: Vec<WireLoc>,
    pub board_generation_number: Option<Generation>,
}

impl GroupsToRemovePayload {
    fn selection(&self) -> Result<Vec<SelectionEntry>, GatewayError> {
        self.selected.iter().map(|g| decode_group(g)).collect()
    }
}

impl TryFrom<GroupsToRemovePayload> for GroupReply {
    type Error = GatewayError;

    fn try_from(payload: GroupsToRemovePayload) -> Result<Self, Self::Error> {
        let toggled = match decode_group(&payload.toggle)? {
            SelectionEntry::Group(group) => Some(group),
            SelectionEntry::NoOp => None,
        };
        Ok(Self {
            toggled,
            selected: payload.selection()?,
            generation: payload.board_generation_number,
        })
    }
}

/// Full match state as the server serializes it
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GameStatePayload {
    pub message: String,
    pub board: Vec<Vec<CellState>>,
    pub black_player_board: Vec<Vec<CellState>>,
    pub white_player_board: Vec<Vec<CellState>>,
    pub current_player: String,
    pub black_captures: i64,
    pub white_captures: i64,
    pub black_guess_stones: Vec<Vec<usize>>,
    pub white_guess_stones: Vec<Vec<usize>>,
    pub stones_in_atari: StonesInAtari,
    pub counting: bool,
    pub winner: Option<String>,
    pub board_generation_number: Generation,
    pub rejoin_required: bool,
    pub groups_selected_during_counting: GroupsToRemovePayload,
    pub ready_to_count: ReadyToCount,
}

impl GameStatePayload {
    pub fn rejection(&self) -> Option<Rejection> {
        rejection_from_message(&self.message)
    }

    fn turn(&self) -> Result<Turn, GatewayError> {
        if self.current_player.is_empty() {
            return Ok(if self.counting {
                Turn::Counting
            } else {
                Turn::Finished
            });
        }
        self.current_player
            .parse()
            .map_err(|e: phantomgo_core::GameError| GatewayError::Decode(e.to_string()))
    }
}

fn decode_board(rows: Vec<Vec<CellState>>) -> Result<Board, GatewayError> {
    Board::from_rows(rows).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn decode_pairs(pairs: &[Vec<usize>]) -> Result<Vec<Coord>, GatewayError> {
    pairs
        .iter()
        .map(|pair| match pair.as_slice() {
            [row, col] => Ok(Coord::new(*row, *col)),
            other => Err(GatewayError::Decode(format!(
                "guess stone must be a [row, col] pair, got {:?}",
                other
            ))),
        })
        .collect()
}

impl TryFrom<GameStatePayload> for BoardSnapshot {
    type Error = GatewayError;

    fn try_from(payload: GameStatePayload) -> Result<Self, Self::Error> {
        let turn = payload.turn()?;
        let selected_groups = payload.groups_selected_during_counting.selection()?;
        let guess_stones = GuessLists {
            black: decode_pairs(&payload.black_guess_stones)?,
            white: decode_pairs(&payload.white_guess_stones)?,
        };

        Ok(BoardSnapshot {
            generation: payload.board_generation_number,
            board: decode_board(payload.board)?,
            black_view: decode_board(payload.black_player_board)?,
            white_view: decode_board(payload.white_player_board)?,
            turn,
            captures: Captures {
                black: payload.black_captures,
                white: payload.white_captures,
            },
            stones_in_atari: payload.stones_in_atari,
            guess_stones,
            counting: payload.counting,
            winner: payload.winner.as_deref().map(GameOutcome::parse),
            rejoin_required: payload.rejoin_required,
            selected_groups,
            ready_to_count: payload.ready_to_count,
            message: payload.message,
        })
    }
}

impl TryFrom<GameStatePayload> for PassAck {
    type Error = GatewayError;

    fn try_from(payload: GameStatePayload) -> Result<Self, Self::Error> {
        Ok(Self {
            generation: payload.board_generation_number,
            turn: payload.turn()?,
            counting: payload.counting,
            message: payload.message,
        })
    }
}

/// Answer of the lightweight "anything new?" call
#[derive(Debug, Deserialize)]
pub struct GameInfoPayload {
    pub should_sync: bool,
    #[serde(default)]
    pub move_number: usize,
    pub board_generation_number: Generation,
    #[serde(default)]
    pub winner: Option<serde_json::Value>,
    #[serde(default)]
    pub rejoin_required: bool,
}

fn decode_outcome(value: serde_json::Value) -> Option<GameOutcome> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(GameOutcome::parse(&text)),
        other => Some(GameOutcome::Unrecognized(other.to_string())),
    }
}

impl From<GameInfoPayload> for UpdateCheck {
    fn from(payload: GameInfoPayload) -> Self {
        Self {
            should_sync: payload.should_sync,
            move_number: payload.move_number,
            generation: payload.board_generation_number,
            winner: payload.winner.and_then(decode_outcome),
            rejoin_required: payload.rejoin_required,
        }
    }
}

/// Guess upload acknowledgement, either structured or a bare string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GuessSyncReply {
    Ack {
        message: String,
        #[serde(default)]
        board_generation_number: Option<Generation>,
    },
    Text(String),
}

impl From<GuessSyncReply> for GuessAck {
    fn from(reply: GuessSyncReply) -> Self {
        match reply {
            GuessSyncReply::Ack {
                message,
                board_generation_number,
            } => Self {
                message,
                generation: board_generation_number,
            },
            GuessSyncReply::Text(message) => Self {
                message,
                generation: None,
            },
        }
    }
}

pub fn score_reply(text: String) -> ScoreReply {
    if text == WAITING_FOR_OTHER_PLAYER {
        ScoreReply::Waiting
    } else {
        ScoreReply::Result(text)
    }
}
