//! Online session endpoints

use crate::peer::{HostInfo, SessionError};
use crate::state::ServerState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Open a room on this instance and seat it as host
pub async fn host_session(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<HostInfo>, SessionError> {
    Ok(Json(state.peers.host().await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub host_url: String,
    pub room_id: String,
}

/// Dial a host's room and seat this instance as guest
pub async fn join_session(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<Value>, SessionError> {
    state
        .peers
        .join(&request.host_url, &request.room_id)
        .await?;
    Ok(Json(json!({
        "joined": true,
        "roomId": request.room_id,
    })))
}
