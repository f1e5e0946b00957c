// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background polling of the authoritative match state
//!
//! One cycle flushes unconfirmed guess stones, asks the server whether
//! anything changed, fetches the full snapshot when needed and merges it.
//! The loop sleeps a fixed interval after each cycle and stops on a terminal
//! phase, a rejoin request or after too many consecutive failures.

use crate::engine::MatchClient;
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::phase::MatchPhase;
use crate::state::SnapshotSource;
use phantomgo_core::Role;
use std::fmt;
use std::time::Duration;

/// Where the current cycle is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    AwaitingCheck,
    AwaitingFetch,
    Applying,
    /// The last cycle failed; the next one is a retry
    Retrying,
}

/// Why the sync loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncExit {
    /// The match ended and its final state was applied
    Finished(MatchPhase),
    /// The server no longer holds this player's seat
    RejoinRequired,
    /// The server does not know the match
    MatchNotFound,
    /// Too many consecutive failures; the user has to reload
    RetryBudgetExhausted { failures: u32, last_error: String },
}

impl SyncExit {
    /// Whether the user has to reload or rejoin
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncExit::Finished(_))
    }
}

impl fmt::Display for SyncExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncExit::Finished(phase) => write!(f, "match {}", phase),
            SyncExit::RejoinRequired => f.write_str("session expired, please rejoin the match"),
            SyncExit::MatchNotFound => f.write_str("match not found on server"),
            SyncExit::RetryBudgetExhausted {
                failures,
                last_error,
            } => write!(
                f,
                "lost connection after {} attempts ({}), please refresh",
                failures, last_error
            ),
        }
    }
}

/// Result of a single cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing new on the server
    UpToDate,
    /// A snapshot was fetched; `accepted` tells whether it was newer
    Fetched { accepted: bool },
    /// The loop must stop
    Terminal(SyncExit),
}

pub struct SyncLoop {
    client: MatchClient,
    interval: Duration,
    max_retries: u32,
    stage: SyncStage,
}

impl SyncLoop {
    pub fn new(client: MatchClient) -> Self {
        let interval = client.config().effective_poll_interval();
        let max_retries = client.config().effective_max_retries();
        Self {
            client,
            interval,
            max_retries,
            stage: SyncStage::Idle,
        }
    }

    pub fn stage(&self) -> SyncStage {
        self.stage
    }

    fn enter(&mut self, stage: SyncStage) {
        tracing::trace!(from = ?self.stage, to = ?stage, "Sync stage");
        self.stage = stage;
    }

    /// Poll until a terminal condition; never returns early otherwise
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.client.session().match_id))]
    pub async fn run(mut self) -> SyncExit {
        let mut failures = 0u32;

        let exit = loop {
            match self.cycle().await {
                Ok(CycleOutcome::Terminal(exit)) => break exit,
                Ok(_) => failures = 0,
                Err(ClientError::Gateway(e)) if e.is_not_found() => break SyncExit::MatchNotFound,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        failures,
                        max_retries = self.max_retries,
                        transport = e.is_transport(),
                        error = %e,
                        "Sync cycle failed"
                    );
                    if failures >= self.max_retries {
                        break SyncExit::RetryBudgetExhausted {
                            failures,
                            last_error: e.to_string(),
                        };
                    }
                    self.enter(SyncStage::Retrying);
                }
            }

            tokio::time::sleep(self.interval).await;
        };

        if exit.is_fatal() {
            tracing::error!(%exit, "Sync loop stopped");
            self.client
                .update(|s| s.disable_controls().into_iter().collect());
        } else {
            tracing::info!(%exit, "Sync loop finished");
        }
        self.enter(SyncStage::Idle);
        self.client
            .publish(vec![ClientEvent::SyncHalted(exit.clone())]);
        exit
    }

    /// One check-fetch-apply pass
    pub async fn cycle(&mut self) -> Result<CycleOutcome> {
        let flushed = self.client.flush_pending_guesses().await;
        if flushed > 0 {
            tracing::debug!(flushed, "Re-sent pending guess stones");
        }

        let (phase, generation) = self.client.read(|s| (s.phase(), s.generation()));
        let session = self.client.session().clone();

        // Generation the check reported for the room, if one was made
        let mut checked = None;

        // A known generation while playing allows the cheap check first
        if let (MatchPhase::Playing, Some(generation)) = (phase, generation) {
            self.enter(SyncStage::AwaitingCheck);
            let check = match self
                .client
                .service()
                .check_for_updates(&session, generation)
                .await
            {
                Ok(check) => check,
                Err(e) => {
                    self.enter(SyncStage::Idle);
                    return Err(e.into());
                }
            };

            if check.rejoin_required {
                return Ok(CycleOutcome::Terminal(SyncExit::RejoinRequired));
            }
            if !check.should_sync && check.winner.is_none() {
                tracing::trace!(generation, move_number = check.move_number, "Up to date");
                self.enter(SyncStage::Idle);
                return Ok(CycleOutcome::UpToDate);
            }
            tracing::trace!(
                generation,
                server_generation = check.generation,
                move_number = check.move_number,
                "Server has news"
            );
            checked = Some(check.generation);
        }

        self.enter(SyncStage::AwaitingFetch);
        let fetch = self.client.begin_fetch();
        let mut snapshot = match self.client.service().sync_boards(&session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.enter(SyncStage::Idle);
                return Err(e.into());
            }
        };
        if snapshot.rejoin_required {
            return Ok(CycleOutcome::Terminal(SyncExit::RejoinRequired));
        }

        // Spectator snapshots carry no generation of their own; the room
        // generation from this cycle's check stands in for it
        if let (Role::Spectator, Some(room_generation)) = (session.role, checked) {
            if snapshot.generation < room_generation {
                tracing::trace!(room_generation, "Stamping spectator snapshot");
                snapshot.generation = room_generation;
            }
        }

        self.enter(SyncStage::Applying);
        let incoming = snapshot.generation;
        let mut accepted = false;
        self.client.update(|s| {
            let before = s.generation();
            let events = s.apply_snapshot(snapshot, SnapshotSource::Poll(fetch));
            accepted = s.generation() != before;
            events
        });
        tracing::debug!(incoming, accepted, "Fetched snapshot");
        self.enter(SyncStage::Idle);

        let phase = self.client.phase();
        if phase.is_terminal() {
            return Ok(CycleOutcome::Terminal(SyncExit::Finished(phase)));
        }
        Ok(CycleOutcome::Fetched { accepted })
    }
}
