// SPDX-License-Identifier: MIT OR Apache-2.0

//! The match client handle
//!
//! [`MatchClient`] is cheap to clone. Every user operation is an async
//! method that issues one request, then merges the reply into the shared
//! [`MatchClientState`] under a short lock and broadcasts the resulting
//! [`ClientEvent`]s.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::gateway::{Dimensions, HttpGateway, MatchService, Rejection, Reply, ScoreReply, Session};
use crate::guess::{FetchTicket, PendingSync};
use crate::phase::{Affordances, MatchPhase};
use crate::state::{GuessMode, MatchClientState, SnapshotSource};
use crate::sync::{CycleOutcome, SyncExit, SyncLoop};
use parking_lot::Mutex;
use phantomgo_core::{BoardSnapshot, Color, Coord, GameOutcome, Generation, Group, Role};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Fate of a guess edit after the upload attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The server stored the new list
    Confirmed,
    /// Upload failed; the list stays local and is re-sent by the sync loop
    Deferred,
    /// The edit did not change anything
    Unchanged,
}

struct Inner {
    session: Session,
    service: Arc<dyn MatchService>,
    state: Mutex<MatchClientState>,
    events_tx: broadcast::Sender<ClientEvent>,
    config: ClientConfig,
}

/// Client side of one match
#[derive(Clone)]
pub struct MatchClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchClient")
            .field("session", &self.inner.session)
            .field("generation", &self.generation())
            .field("phase", &self.phase())
            .finish()
    }
}

impl MatchClient {
    pub fn new(session: Session, service: Arc<dyn MatchService>, config: ClientConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_buffer_size.max(1));
        let state = MatchClientState::new(session.role);

        Self {
            inner: Arc::new(Inner {
                session,
                service,
                state: Mutex::new(state),
                events_tx,
                config,
            }),
        }
    }

    /// Client backed by the HTTP gateway at `config.server_url`
    pub fn with_http(session: Session, config: ClientConfig) -> Result<Self> {
        let gateway = HttpGateway::new(config.server_url.clone(), config.request_timeout)?;
        Ok(Self::new(session, Arc::new(gateway), config))
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn service(&self) -> &dyn MatchService {
        self.inner.service.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events_tx.subscribe()
    }

    pub(crate) fn publish(&self, events: Vec<ClientEvent>) {
        for event in events {
            // No receivers is fine
            let _ = self.inner.events_tx.send(event);
        }
    }

    /// Run `f` against the locked state and publish the events it returns
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MatchClientState) -> Vec<ClientEvent>,
    {
        let events = {
            let mut state = self.inner.state.lock();
            f(&mut state)
        };
        self.publish(events);
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&MatchClientState) -> R) -> R {
        f(&self.inner.state.lock())
    }

    /// Number the next snapshot fetch
    pub(crate) fn begin_fetch(&self) -> FetchTicket {
        self.inner.state.lock().begin_fetch()
    }

    pub fn role(&self) -> Role {
        self.inner.session.role
    }

    pub fn generation(&self) -> Option<Generation> {
        self.read(|s| s.generation())
    }

    pub fn phase(&self) -> MatchPhase {
        self.read(|s| s.phase())
    }

    pub fn affordances(&self) -> Affordances {
        self.read(|s| s.affordances())
    }

    /// Latest applied snapshot
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.read(|s| s.snapshot().cloned())
    }

    pub fn guess_stones(&self, color: Color) -> Vec<Coord> {
        self.read(|s| s.guess_stones(color).to_vec())
    }

    pub fn dead_groups(&self) -> Vec<Group> {
        self.read(|s| s.dead_groups())
    }

    pub fn guess_mode(&self) -> GuessMode {
        self.read(|s| s.guess_mode())
    }

    pub fn set_guess_mode(&self, mode: GuessMode) {
        self.inner.state.lock().set_guess_mode(mode);
    }

    /// Advance the guess mode and return the new one
    pub fn toggle_guess_mode(&self) -> GuessMode {
        let mut state = self.inner.state.lock();
        let mode = state.guess_mode().cycle();
        state.set_guess_mode(mode);
        mode
    }

    fn require(&self, action: &'static str, allowed: impl FnOnce(&Affordances) -> bool) -> Result<()> {
        let (affordances, phase) = self.read(|s| (s.affordances(), s.phase()));
        if allowed(&affordances) {
            Ok(())
        } else {
            Err(ClientError::NotAllowed { action, phase })
        }
    }

    fn check_coord(&self, coord: Coord) -> Result<()> {
        if self.read(|s| s.contains(coord)) {
            Ok(())
        } else {
            Err(ClientError::InvalidCoordinate(coord))
        }
    }

    fn session_lost(&self) -> ClientError {
        tracing::warn!(match_id = %self.inner.session.match_id, "Server requires a rejoin");
        self.update(|s| s.disable_controls().into_iter().collect());
        ClientError::SessionLost
    }

    fn apply_move_reply(&self, reply: Reply<BoardSnapshot>) -> Result<()> {
        match reply {
            Reply::Applied(snapshot) if snapshot.rejoin_required => Err(self.session_lost()),
            Reply::Applied(snapshot) => {
                let message = snapshot.message.clone();
                self.update(|s| {
                    let mut events = s.apply_snapshot(snapshot, SnapshotSource::MoveReply);
                    if !message.is_empty() {
                        events.push(ClientEvent::ServerMessage(message));
                    }
                    events
                });
                Ok(())
            }
            Reply::Rejected(rejection) => {
                let Rejection::NotYourTurn(message) = rejection;
                tracing::info!(%message, "Action rejected by server");
                self.publish(vec![ClientEvent::Rejected { message }]);
                Ok(())
            }
        }
    }

    /// Fetch the board size; must be called before the first click
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn connect(&self) -> Result<Dimensions> {
        let dimensions = self
            .service()
            .dimensions(&self.inner.session.match_id)
            .await?;
        self.inner.state.lock().set_dimensions(dimensions);
        tracing::info!(
            rows = dimensions.rows,
            cols = dimensions.cols,
            role = %self.role(),
            "Connected to match"
        );
        Ok(dimensions)
    }

    /// Route a board click according to the phase and guess mode
    pub async fn click_cell(&self, coord: Coord) -> Result<()> {
        let (phase, mode) = self.read(|s| (s.phase(), s.guess_mode()));
        match (phase, mode) {
            (MatchPhase::Counting, _) => self.toggle_group(coord).await,
            (MatchPhase::Playing, GuessMode::Off) => self.place_stone(coord).await,
            (MatchPhase::Playing, GuessMode::Adding) => self.add_guess(coord).await.map(|_| ()),
            (MatchPhase::Playing, GuessMode::Removing) => {
                self.remove_guess(coord).await.map(|_| ())
            }
            (MatchPhase::Finished(_), _) => Err(ClientError::NotAllowed {
                action: "click the board",
                phase,
            }),
        }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn place_stone(&self, coord: Coord) -> Result<()> {
        self.require("place a stone", |a| a.place_stone)?;
        self.check_coord(coord)?;

        let generation = self.read(|s| s.declared_generation());
        let reply = self
            .service()
            .cell_click(&self.inner.session, coord, generation)
            .await
            .map_err(|e| {
                tracing::warn!(%coord, error = %e, "Move request failed");
                e
            })?;
        self.apply_move_reply(reply)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn pass(&self) -> Result<()> {
        self.require("pass", |a| a.pass)?;

        let reply = self
            .service()
            .pass(&self.inner.session)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Pass request failed");
                e
            })?;

        match reply {
            Reply::Applied(ack) => {
                self.update(|s| s.apply_pass_ack(ack));
                Ok(())
            }
            Reply::Rejected(Rejection::NotYourTurn(message)) => {
                self.publish(vec![ClientEvent::Rejected { message }]);
                Ok(())
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn undo(&self) -> Result<()> {
        self.require("undo", |a| a.undo)?;

        let generation = self.read(|s| s.declared_generation());
        let reply = self
            .service()
            .undo(&self.inner.session, generation)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Undo request failed");
                e
            })?;
        self.apply_move_reply(reply)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn resign(&self) -> Result<()> {
        self.require("resign", |a| a.resign)?;

        let mut snapshot = self
            .service()
            .resign(&self.inner.session)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Resign request failed");
                e
            })?;
        // The resignation reply names the winner by color only
        if let Some(GameOutcome::Winner(winner)) = snapshot.winner {
            snapshot.winner = Some(GameOutcome::Resignation { winner });
        }
        self.apply_move_reply(Reply::Applied(snapshot))
    }

    fn guess_color(&self, action: &'static str) -> Result<Color> {
        self.require(action, |a| a.edit_guesses)?;
        self.role().guess_color().ok_or(ClientError::NotAllowed {
            action,
            phase: self.phase(),
        })
    }

    /// Add a guess stone locally, then confirm it with the server
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn add_guess(&self, coord: Coord) -> Result<Confirmation> {
        let color = self.guess_color("add a guess stone")?;
        self.check_coord(coord)?;

        let pending = {
            let mut state = self.inner.state.lock();
            if !state.is_cell_empty(coord) {
                None
            } else {
                state.add_guess(color, coord)
            }
        };
        self.confirm_local_edit(pending).await
    }

    /// Remove a guess stone locally, then confirm it with the server
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn remove_guess(&self, coord: Coord) -> Result<Confirmation> {
        let color = self.guess_color("remove a guess stone")?;
        self.check_coord(coord)?;

        let pending = self.inner.state.lock().remove_guess(color, coord);
        self.confirm_local_edit(pending).await
    }

    async fn confirm_local_edit(&self, pending: Option<PendingSync>) -> Result<Confirmation> {
        let Some(pending) = pending else {
            return Ok(Confirmation::Unchanged);
        };
        self.publish(vec![ClientEvent::GuessStonesUpdated {
            color: pending.color,
        }]);
        Ok(self.confirm_guesses(&pending).await)
    }

    async fn confirm_guesses(&self, pending: &PendingSync) -> Confirmation {
        let generation = self.read(|s| s.declared_generation());
        let result = self
            .service()
            .sync_guess_stones(&self.inner.session, pending.color, &pending.stones, generation)
            .await;

        match result {
            Ok(ack) => {
                tracing::debug!(
                    color = %pending.color,
                    revision = pending.revision,
                    message = %ack.message,
                    "Guess stones confirmed"
                );
                self.inner.state.lock().apply_guess_ack(pending, &ack);
                Confirmation::Confirmed
            }
            Err(e) => {
                tracing::warn!(
                    color = %pending.color,
                    error = %e,
                    "Guess upload failed, will retry on next sync"
                );
                Confirmation::Deferred
            }
        }
    }

    /// Re-send every guess list the server has not acknowledged.
    ///
    /// Returns how many lists were confirmed.
    pub async fn flush_pending_guesses(&self) -> usize {
        let pending = self.read(|s| s.pending_guesses());
        let mut confirmed = 0;
        for list in &pending {
            if self.confirm_guesses(list).await == Confirmation::Confirmed {
                confirmed += 1;
            }
        }
        confirmed
    }

    /// Mark or unmark the group at `coord` as dead
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn toggle_group(&self, coord: Coord) -> Result<()> {
        self.require("select groups", |a| a.select_groups)?;
        self.check_coord(coord)?;

        let reply = self
            .service()
            .get_group(&self.inner.session, coord)
            .await
            .map_err(|e| {
                tracing::warn!(%coord, error = %e, "Group request failed");
                e
            })?;
        self.update(|s| s.apply_group_reply(reply));
        Ok(())
    }

    /// Ask for the final count with the groups currently marked dead
    #[tracing::instrument(level = "debug", skip(self), fields(match_id = %self.inner.session.match_id))]
    pub async fn request_score(&self) -> Result<ScoreReply> {
        self.require("request the score", |a| a.request_score)?;

        let dead_groups = self.dead_groups();
        let reply = self
            .service()
            .get_score(&self.inner.session, &dead_groups)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Score request failed");
                e
            })?;

        match &reply {
            ScoreReply::Waiting => self.publish(vec![ClientEvent::ScorePending]),
            ScoreReply::Result(descriptor) => {
                let outcome = GameOutcome::parse(descriptor);
                tracing::info!(%descriptor, "Score received");
                let result = ClientEvent::ScoreResult {
                    descriptor: descriptor.clone(),
                    outcome,
                };
                if self.role().is_player() {
                    self.update(|s| {
                        let mut events = vec![result];
                        events.extend(s.finish_scored());
                        events
                    });
                } else {
                    self.publish(vec![result]);
                }
            }
        }
        Ok(reply)
    }

    /// SGF record of this match
    pub async fn game_record(&self) -> Result<String> {
        Ok(self
            .service()
            .game_record(&self.inner.session.match_id)
            .await?)
    }

    /// Identifiers of every open match on the server
    pub async fn list_games(&self) -> Result<Vec<String>> {
        Ok(self.service().list_games().await?)
    }

    /// Run one sync cycle
    pub async fn sync_once(&self) -> Result<CycleOutcome> {
        SyncLoop::new(self.clone()).cycle().await
    }

    /// Start the background sync loop
    pub fn spawn_sync_loop(&self) -> JoinHandle<SyncExit> {
        let sync_loop = SyncLoop::new(self.clone());
        tokio::spawn(sync_loop.run())
    }
}
