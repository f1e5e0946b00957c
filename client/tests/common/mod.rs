// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common utilities for match client integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use phantomgo_client::gateway::{
    Dimensions, GroupReply, GuessAck, PassAck, Reply, ScoreReply, UpdateCheck,
};
use phantomgo_client::{ClientConfig, GatewayError, MatchClient, MatchService, Session};
use phantomgo_core::{BoardSnapshot, Color, Coord, Generation, Group, Role};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// Initialize logging for tests
static INIT_LOGGING: Lazy<()> = Lazy::new(|| {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

pub fn init_logging() {
    Lazy::force(&INIT_LOGGING);
}

type Scripted<T> = VecDeque<Result<T, GatewayError>>;

/// A guess upload as the server received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessUpload {
    pub color: Color,
    pub stones: Vec<Coord>,
    pub generation: Generation,
}

#[derive(Default)]
struct Script {
    checks: Scripted<UpdateCheck>,
    fetches: Scripted<BoardSnapshot>,
    clicks: Scripted<Reply<BoardSnapshot>>,
    guesses: Scripted<GuessAck>,
    groups: Scripted<GroupReply>,
    scores: Scripted<ScoreReply>,
    passes: Scripted<Reply<PassAck>>,
    undos: Scripted<Reply<BoardSnapshot>>,
    resigns: Scripted<BoardSnapshot>,
    calls: Vec<&'static str>,
    uploads: Vec<GuessUpload>,
    guess_gate: Option<Arc<Notify>>,
}

fn unscripted<T>(call: &str) -> Result<T, GatewayError> {
    Err(GatewayError::Decode(format!("no scripted reply for {call}")))
}

fn next<T>(queue: &mut Scripted<T>, call: &str) -> Result<T, GatewayError> {
    queue.pop_front().unwrap_or_else(|| unscripted(call))
}

/// In-memory match service answering from per-call reply queues
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<Script>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_check(&self, reply: Result<UpdateCheck, GatewayError>) {
        self.script.lock().checks.push_back(reply);
    }

    pub fn push_fetch(&self, reply: Result<BoardSnapshot, GatewayError>) {
        self.script.lock().fetches.push_back(reply);
    }

    pub fn push_click(&self, reply: Result<Reply<BoardSnapshot>, GatewayError>) {
        self.script.lock().clicks.push_back(reply);
    }

    pub fn push_guess(&self, reply: Result<GuessAck, GatewayError>) {
        self.script.lock().guesses.push_back(reply);
    }

    pub fn push_group(&self, reply: Result<GroupReply, GatewayError>) {
        self.script.lock().groups.push_back(reply);
    }

    pub fn push_score(&self, reply: Result<ScoreReply, GatewayError>) {
        self.script.lock().scores.push_back(reply);
    }

    pub fn push_pass(&self, reply: Result<Reply<PassAck>, GatewayError>) {
        self.script.lock().passes.push_back(reply);
    }

    pub fn push_resign(&self, reply: Result<BoardSnapshot, GatewayError>) {
        self.script.lock().resigns.push_back(reply);
    }

    /// Hold the next guess upload until the returned gate is notified
    pub fn gate_next_guess(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().guess_gate = Some(gate.clone());
        gate
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.script.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn uploads(&self) -> Vec<GuessUpload> {
        self.script.lock().uploads.clone()
    }

    fn record(&self, call: &'static str) -> parking_lot::MutexGuard<'_, Script> {
        let mut script = self.script.lock();
        script.calls.push(call);
        script
    }
}

#[async_trait]
impl MatchService for ScriptedService {
    async fn dimensions(&self, _match_id: &str) -> Result<Dimensions, GatewayError> {
        self.record("dimensions");
        Ok(Dimensions { rows: 9, cols: 9 })
    }

    async fn cell_click(
        &self,
        _session: &Session,
        _coord: Coord,
        _generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError> {
        next(&mut self.record("cell_click").clicks, "cell_click")
    }

    async fn sync_guess_stones(
        &self,
        _session: &Session,
        color: Color,
        stones: &[Coord],
        generation: Generation,
    ) -> Result<GuessAck, GatewayError> {
        let gate = {
            let mut script = self.record("sync_guess_stones");
            script.uploads.push(GuessUpload {
                color,
                stones: stones.to_vec(),
                generation,
            });
            script.guess_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        next(&mut self.script.lock().guesses, "sync_guess_stones")
    }

    async fn get_group(&self, _session: &Session, _coord: Coord) -> Result<GroupReply, GatewayError> {
        next(&mut self.record("get_group").groups, "get_group")
    }

    async fn get_score(
        &self,
        _session: &Session,
        _dead_groups: &[Group],
    ) -> Result<ScoreReply, GatewayError> {
        next(&mut self.record("get_score").scores, "get_score")
    }

    async fn check_for_updates(
        &self,
        _session: &Session,
        _generation: Generation,
    ) -> Result<UpdateCheck, GatewayError> {
        next(&mut self.record("check_for_updates").checks, "check_for_updates")
    }

    async fn sync_boards(&self, _session: &Session) -> Result<BoardSnapshot, GatewayError> {
        next(&mut self.record("sync_boards").fetches, "sync_boards")
    }

    async fn pass(&self, _session: &Session) -> Result<Reply<PassAck>, GatewayError> {
        next(&mut self.record("pass").passes, "pass")
    }

    async fn undo(
        &self,
        _session: &Session,
        _generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError> {
        next(&mut self.record("undo").undos, "undo")
    }

    async fn resign(&self, _session: &Session) -> Result<BoardSnapshot, GatewayError> {
        next(&mut self.record("resign").resigns, "resign")
    }

    async fn game_record(&self, _match_id: &str) -> Result<String, GatewayError> {
        self.record("game_record");
        Ok("(;GM[1]SZ[9])".to_string())
    }

    async fn list_games(&self) -> Result<Vec<String>, GatewayError> {
        self.record("list_games");
        Ok(vec!["test-match".to_string()])
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_secs(1),
        max_retries: 3,
        ..ClientConfig::default()
    }
}

/// A connected client for `role` talking to `service`
pub async fn connected_client(role: Role, service: Arc<ScriptedService>) -> MatchClient {
    init_logging();
    let session = Session::new("test-match", "token", role);
    let client = MatchClient::new(session, service, test_config());
    client.connect().await.unwrap();
    client
}

pub fn snapshot(generation: Generation) -> BoardSnapshot {
    BoardSnapshot::empty(9, 9, generation)
}

pub fn check(should_sync: bool, generation: Generation) -> UpdateCheck {
    UpdateCheck {
        should_sync,
        move_number: 0,
        generation,
        winner: None,
        rejoin_required: false,
    }
}

pub fn transport_error() -> GatewayError {
    GatewayError::Transport("connection refused".to_string())
}

pub fn ack() -> GuessAck {
    GuessAck {
        message: "Stones synced".to_string(),
        generation: None,
    }
}

pub fn group(coords: &[(usize, usize)]) -> Group {
    Group::new(coords.iter().map(|(r, c)| Coord::new(*r, *c)).collect()).unwrap()
}

/// Bring a fresh client to `generation` with one accepted poll
pub async fn sync_to(client: &MatchClient, service: &ScriptedService, generation: Generation) {
    service.push_fetch(Ok(snapshot(generation)));
    client.sync_once().await.unwrap();
    assert_eq!(client.generation(), Some(generation));
}
