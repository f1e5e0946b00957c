// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phantom Go match client
//!
//! Keeps a speculative local view of a match in step with the authoritative
//! server state:
//! - [`generation`] decides which payloads are newer than what is shown
//! - [`guess`] buffers guess stones until the server confirms them
//! - [`selection`] tracks dead groups during counting
//! - [`phase`] drives the playing, counting and finished phases
//! - [`sync`] polls the server in the background
//! - [`gateway`] issues requests and normalizes their failures

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod generation;
pub mod guess;
pub mod phase;
pub mod selection;
pub mod state;
pub mod sync;

pub use config::ClientConfig;
pub use engine::{Confirmation, MatchClient};
pub use error::ClientError;
pub use events::ClientEvent;
pub use gateway::{GatewayError, MatchService, Session};
pub use phase::{Affordances, FinishReason, MatchPhase};
pub use state::GuessMode;
pub use sync::{CycleOutcome, SyncExit, SyncLoop, SyncStage};
