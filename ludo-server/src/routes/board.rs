//! Board geometry endpoint

use axum::Json;
use ludo_core::BoardLayout;

/// Get board geometry
pub async fn get_board() -> Json<BoardLayout> {
    Json(BoardLayout::standard())
}
