//! Status endpoint

use crate::state::ServerState;
use axum::{extract::State, Json};
use ludo_core::OnlineStatus;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub engine: &'static str,
    pub table_version: u64,
    pub online_status: OnlineStatus,
}

pub async fn status_handler(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    let snapshot = state.table.snapshot();
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        engine: "ludo-core",
        table_version: snapshot.version,
        online_status: snapshot.state.online_status,
    })
}
