// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-over-HTTP implementation of [`MatchService`]

use super::messages::{
    self, CellClickRequest, DimensionsPayload, ErrorPayload, GameInfoPayload, GameStatePayload,
    GetGroupRequest, GetScoreRequest, GroupsToRemovePayload, GuessStonesRequest, GuessSyncReply,
    MatchRequest, PlayerRequest, ShouldSyncRequest, UndoRequest,
};
use super::{
    Dimensions, GatewayError, GroupReply, GuessAck, MatchService, PassAck, Reply, ScoreReply,
    Session, UpdateCheck,
};
use async_trait::async_trait;
use phantomgo_core::{BoardSnapshot, Color, Coord, Generation, Group};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Talks to the match server over plain HTTP POST requests
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("PhantomGo-Client")
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Error bodies are `{"error": "..."}`; fall back to the raw text
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorPayload>(&text)
            .map(|payload| payload.error)
            .unwrap_or(text);
        tracing::debug!(path, status = status.as_u16(), %message, "Request refused");

        Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(path, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn post_state<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<GameStatePayload, GatewayError> {
        self.post_json(path, body).await
    }
}

fn snapshot_reply(payload: GameStatePayload) -> Result<Reply<BoardSnapshot>, GatewayError> {
    match payload.rejection() {
        Some(rejection) => Ok(Reply::Rejected(rejection)),
        None => BoardSnapshot::try_from(payload).map(Reply::Applied),
    }
}

#[async_trait]
impl MatchService for HttpGateway {
    async fn dimensions(&self, match_id: &str) -> Result<Dimensions, GatewayError> {
        let payload: DimensionsPayload = self
            .post_json("dimensions", &MatchRequest {
                match_string: match_id,
            })
            .await?;
        Ok(payload.into())
    }

    async fn cell_click(
        &self,
        session: &Session,
        coord: Coord,
        generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError> {
        let payload = self
            .post_state(
                "cell-click",
                &CellClickRequest {
                    row: coord.row,
                    col: coord.col,
                    match_string: &session.match_id,
                    session_token: &session.token,
                    board_generation_number: generation,
                },
            )
            .await?;
        snapshot_reply(payload)
    }

    async fn sync_guess_stones(
        &self,
        session: &Session,
        color: Color,
        stones: &[Coord],
        generation: Generation,
    ) -> Result<GuessAck, GatewayError> {
        let reply: GuessSyncReply = self
            .post_json(
                "sync-guess-stones",
                &GuessStonesRequest::new(&session.match_id, color, stones, generation),
            )
            .await?;
        Ok(reply.into())
    }

    async fn get_group(
        &self,
        session: &Session,
        coord: Coord,
    ) -> Result<GroupReply, GatewayError> {
        let payload: GroupsToRemovePayload = self
            .post_json(
                "get-group",
                &GetGroupRequest {
                    row: coord.row,
                    col: coord.col,
                    match_string: &session.match_id,
                    session_token: &session.token,
                },
            )
            .await?;
        GroupReply::try_from(payload)
    }

    async fn get_score(
        &self,
        session: &Session,
        dead_groups: &[Group],
    ) -> Result<ScoreReply, GatewayError> {
        let text: String = self
            .post_json(
                "get-score",
                &GetScoreRequest::new(&session.match_id, &session.token, dead_groups),
            )
            .await?;
        Ok(messages::score_reply(text))
    }

    async fn check_for_updates(
        &self,
        session: &Session,
        generation: Generation,
    ) -> Result<UpdateCheck, GatewayError> {
        let payload: GameInfoPayload = self
            .post_json(
                "get-board-interaction-number",
                &ShouldSyncRequest {
                    match_string: &session.match_id,
                    player: messages::player_name(session.role),
                    frontend_board_generation_number: generation,
                },
            )
            .await?;
        Ok(payload.into())
    }

    async fn sync_boards(&self, session: &Session) -> Result<BoardSnapshot, GatewayError> {
        let payload = self
            .post_state(
                "sync-boards",
                &PlayerRequest {
                    match_string: &session.match_id,
                    player: messages::player_name(session.role),
                },
            )
            .await?;
        BoardSnapshot::try_from(payload)
    }

    async fn pass(&self, session: &Session) -> Result<Reply<PassAck>, GatewayError> {
        let payload = self
            .post_state(
                "pass",
                &PlayerRequest {
                    match_string: &session.match_id,
                    player: messages::player_name(session.role),
                },
            )
            .await?;
        match payload.rejection() {
            Some(rejection) => Ok(Reply::Rejected(rejection)),
            None => PassAck::try_from(payload).map(Reply::Applied),
        }
    }

    async fn undo(
        &self,
        session: &Session,
        generation: Generation,
    ) -> Result<Reply<BoardSnapshot>, GatewayError> {
        let payload = self
            .post_state(
                "undo",
                &UndoRequest {
                    match_string: &session.match_id,
                    player: messages::player_name(session.role),
                    board_generation_number: generation,
                },
            )
            .await?;
        snapshot_reply(payload)
    }

    async fn resign(&self, session: &Session) -> Result<BoardSnapshot, GatewayError> {
        let payload = self
            .post_state(
                "resign",
                &PlayerRequest {
                    match_string: &session.match_id,
                    player: messages::player_name(session.role),
                },
            )
            .await?;
        BoardSnapshot::try_from(payload)
    }

    async fn game_record(&self, match_id: &str) -> Result<String, GatewayError> {
        let response = self
            .send("get-game-record", &MatchRequest {
                match_string: match_id,
            })
            .await?;
        response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn list_games(&self) -> Result<Vec<String>, GatewayError> {
        self.post_json("get-all-games", &serde_json::json!({})).await
    }
}
