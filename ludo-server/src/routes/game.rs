//! Game API: state snapshots and player intents
//!
//! Intents that are not legal right now (wrong seat, no dice, piece not
//! offered) are accepted and simply leave the snapshot unchanged.

use crate::runtime::{Command, Snapshot};
use crate::state::ServerState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ludo_core::{PieceId, PlayerNames, ResetMode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const POLL_LIMIT: Duration = Duration::from_secs(5);

/// Get the current snapshot
pub async fn get_state(State(state): State<Arc<ServerState>>) -> Json<Snapshot> {
    Json(state.table.snapshot())
}

#[derive(Deserialize)]
pub struct PollParams {
    pub version: Option<u64>,
}

/// Long-poll for table updates
pub async fn poll_state(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PollParams>,
) -> Json<Value> {
    let client_version = params.version.unwrap_or(0);

    match state.table.changed_since(client_version, POLL_LIMIT).await {
        Some(snapshot) => Json(json!({
            "changed": true,
            "version": snapshot.version,
            "state": snapshot.state,
            "events": snapshot.events,
        })),
        None => Json(json!({
            "changed": false,
            "version": client_version,
        })),
    }
}

/// Start a roll for the current player
pub async fn roll(State(state): State<Arc<ServerState>>) -> Response {
    match state.table.apply(Command::Roll).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Move one of the offered pieces
pub async fn select_piece(
    State(state): State<Arc<ServerState>>,
    Path(piece_id): Path<String>,
) -> Response {
    let id: PieceId = match piece_id.parse() {
        Ok(id) => id,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("{}", err) })),
            )
                .into_response();
        }
    };

    match state.table.apply(Command::Select(id)).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize, Default)]
pub struct ResetRequest {
    /// Also leave the online session and return to local play
    #[serde(default)]
    pub disconnect: bool,
}

/// Start a new game
pub async fn reset(
    State(state): State<Arc<ServerState>>,
    body: Option<Json<ResetRequest>>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mode = if request.disconnect {
        state.peers.leave().await;
        ResetMode::Hard
    } else {
        ResetMode::Soft
    };

    match state.table.apply(Command::Reset(mode)).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Rename the seats
pub async fn set_players(
    State(state): State<Arc<ServerState>>,
    Json(names): Json<PlayerNames>,
) -> Response {
    match state.table.apply(Command::SetPlayerNames(names)).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => err.into_response(),
    }
}
