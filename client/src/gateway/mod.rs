// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request boundary towards the match server
//!
//! Every call the engine makes goes through [`MatchService`], which speaks
//! domain types only. Wire formats live in [`messages`] and the HTTP
//! transport in [`http`].

pub mod http;
pub mod messages;

use async_trait::async_trait;
use phantomgo_core::{
    BoardSnapshot, Color, Coord, GameOutcome, Generation, Group, Role, SelectionEntry, Turn,
};
use thiserror::Error;

pub use http::HttpGateway;

/// Identity of this client inside one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub match_id: String,
    pub token: String,
    pub role: Role,
}

impl Session {
    pub fn new(match_id: impl Into<String>, token: impl Into<String>, role: Role) -> Self {
        Self {
            match_id: match_id.into(),
            token: token.into(),
            role,
        }
    }
}

/// Playable board size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

/// Business rejection carried by an otherwise successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Turn-order violation; the payload is the server's message
    NotYourTurn(String),
}

/// Outcome of a mutating call
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Applied(T),
    Rejected(Rejection),
}

/// Acknowledgement of a guess-stone upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessAck {
    pub message: String,
    /// Generation assigned to the upload, when the server reports one
    pub generation: Option<Generation>,
}

/// Acknowledgement of a pass; carries no board
#[derive(Debug, Clone, PartialEq)]
pub struct PassAck {
    pub generation: Generation,
    pub turn: Turn,
    pub counting: bool,
    pub message: String,
}

/// The clicked group together with the merged selection of both players
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReply {
    /// Group that was toggled; `None` for padding
    pub toggled: Option<Group>,
    pub selected: Vec<SelectionEntry>,
    pub generation: Option<Generation>,
}

/// Answer to a score request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreReply {
    /// The other player has not asked for the count yet
    Waiting,
    /// Final or provisional result descriptor
    Result(String),
}

/// Lightweight answer telling whether a full fetch is needed
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCheck {
    pub should_sync: bool,
    pub move_number: usize,
    pub generation: Generation,
    pub winner: Option<GameOutcome>,
    pub rejoin_required: bool,
}

/// Normalized failure of a request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced a response
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be interpreted
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// The request got no answer at all
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    /// The match no longer exists on the server
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status { status: 404, .. })
    }
}

/// Remote match service
#[async_trait]
pub trait MatchService: Send + Sync {
    async fn dimensions(&self, match_id: &str) -> Result<Dimensions, GatewayError>;

    async fn cell_click(
        &self,
        session: &Session,
        coord: Coord,
        generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError>;

    async fn sync_guess_stones(
        &self,
        session: &Session,
        color: Color,
        stones: &[Coord],
        generation: Generation,
    ) -> Result<GuessAck, GatewayError>;

    async fn get_group(&self, session: &Session, coord: Coord)
        -> Result<GroupReply, GatewayError>;

    async fn get_score(
        &self,
        session: &Session,
        dead_groups: &[Group],
    ) -> Result<ScoreReply, GatewayError>;

    async fn check_for_updates(
        &self,
        session: &Session,
        generation: Generation,
    ) -> Result<UpdateCheck, GatewayError>;

    async fn sync_boards(&self, session: &Session) -> Result<BoardSnapshot, GatewayError>;

    async fn pass(&self, session: &Session) -> Result<Reply<PassAck>, GatewayError>;

    async fn undo(
        &self,
        session: &Session,
        generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError>;

    async fn resign(&self, session: &Session) -> Result<BoardSnapshot, GatewayError>;

    /// SGF record of the match
    async fn game_record(&self, match_id: &str) -> Result<String, GatewayError>;

    /// Identifiers of every open match
    async fn list_games(&self) -> Result<Vec<String>, GatewayError>;
}
