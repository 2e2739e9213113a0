//! HTTP route handlers

pub mod board;
pub mod game;
pub mod session;
pub mod status;

use crate::peer::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            SessionError::RuntimeGone => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::Bind(_) | SessionError::Dial { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
