// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation clock and staleness policy
//!
//! Poll responses and mutation responses race each other on the network, so
//! arrival order says nothing about which one is newer. The clock keeps the
//! highest generation applied so far and rejects anything that is not newer.

use phantomgo_core::Generation;

/// Most recent locally-applied revision of the shared match state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationClock {
    /// `None` until the first payload has been applied
    current: Option<Generation>,
}

impl GenerationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generation last applied, if any
    pub fn current(&self) -> Option<Generation> {
        self.current
    }

    /// Value declared to the server as the revision this client acts upon
    pub fn declared(&self) -> Generation {
        self.current.unwrap_or(0)
    }

    /// Accept a payload strictly newer than anything applied so far.
    ///
    /// Ties are stale. Before the first payload every generation is accepted.
    pub fn accept(&mut self, incoming: Generation) -> bool {
        match self.current {
            Some(current) if incoming <= current => {
                tracing::debug!(incoming, current, "Dropping stale payload");
                false
            }
            _ => {
                self.current = Some(incoming);
                true
            }
        }
    }

    /// Accept an acknowledgement that carries a generation but no state.
    ///
    /// Only the immediate successor is taken: a larger jump means some other
    /// revision happened in between and its state still has to be fetched.
    pub fn accept_successor(&mut self, incoming: Generation) -> bool {
        match self.current {
            Some(current) if incoming == current + 1 => {
                self.current = Some(incoming);
                true
            }
            current => {
                tracing::debug!(
                    incoming,
                    current = ?current,
                    "Acknowledgement does not directly follow local state"
                );
                false
            }
        }
    }
}
