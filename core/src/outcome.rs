// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game outcomes as described by the match server

use crate::Color;
use std::fmt;

/// How a finished match ended
#[derive(Debug, Clone, PartialEq)]
pub enum GameOutcome {
    /// The opponent of `winner` resigned
    Resignation { winner: Color },
    /// Won on points after counting
    Points { winner: Color, margin: f32 },
    /// A winner was named without a reason
    Winner(Color),
    /// Equal score
    Draw,
    /// A descriptor this client does not understand
    Unrecognized(String),
}

impl GameOutcome {
    /// Interpret a winner descriptor such as `"white"`, `"Black + R"` or `"White +6.5"`
    pub fn parse(descriptor: &str) -> Self {
        let text = descriptor.trim();

        if text.eq_ignore_ascii_case("draw") || text == "D R A W !" {
            return GameOutcome::Draw;
        }

        if let Ok(color) = text.parse::<Color>() {
            return GameOutcome::Winner(color);
        }

        let (head, tail) = match text.split_once('+') {
            Some(parts) => parts,
            None => return Self::unrecognized(text),
        };
        let winner = match head.parse::<Color>() {
            Ok(color) => color,
            Err(_) => return Self::unrecognized(text),
        };

        let tail = tail.trim();
        if tail.eq_ignore_ascii_case("r") {
            return GameOutcome::Resignation { winner };
        }

        match tail.parse::<f32>() {
            Ok(margin) => GameOutcome::Points { winner, margin },
            Err(_) => Self::unrecognized(text),
        }
    }

    fn unrecognized(text: &str) -> Self {
        tracing::debug!(descriptor = text, "Unrecognized game outcome");
        GameOutcome::Unrecognized(text.to_string())
    }

    /// The winning color, when one is known
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameOutcome::Resignation { winner } | GameOutcome::Points { winner, .. } => {
                Some(*winner)
            }
            GameOutcome::Winner(color) => Some(*color),
            GameOutcome::Draw | GameOutcome::Unrecognized(_) => None,
        }
    }

    pub fn is_resignation(&self) -> bool {
        matches!(self, GameOutcome::Resignation { .. })
    }
}

fn title(color: Color) -> &'static str {
    match color {
        Color::Black => "Black",
        Color::White => "White",
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Resignation { winner } => write!(f, "{} + R", title(*winner)),
            GameOutcome::Points { winner, margin } => write!(f, "{} +{}", title(*winner), margin),
            GameOutcome::Winner(color) => f.write_str(title(*color)),
            GameOutcome::Draw => f.write_str("Draw"),
            GameOutcome::Unrecognized(text) => f.write_str(text),
        }
    }
}
