// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::gateway::GatewayError;
use crate::phase::MatchPhase;
use phantomgo_core::Coord;
use thiserror::Error;

/// Failure of a match client operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The current role or phase does not offer this action
    #[error("Cannot {action} while {phase}")]
    NotAllowed {
        action: &'static str,
        phase: MatchPhase,
    },

    #[error("Coordinate {0} is outside the board")]
    InvalidCoordinate(Coord),

    /// The server no longer recognizes this session
    #[error("Session lost, rejoin the match")]
    SessionLost,
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Gateway(e) if e.is_transport())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
