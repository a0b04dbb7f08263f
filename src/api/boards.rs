//! Board listing endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::Board;

use super::routes::AppState;
use super::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_boards))
}

/// GET /api/boards - All boards, newest first.
async fn list_boards(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Board>>, ApiError> {
    Ok(Json(state.with_db(|db| db.list_boards()).await?))
}
