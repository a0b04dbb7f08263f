//! Subtask endpoints addressed by subtask id.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde_json::{json, Value};

use super::routes::AppState;
use super::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id", put(toggle_subtask).delete(delete_subtask))
}

/// PUT /api/subtasks/:id - Flip completion.
async fn toggle_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let updated = state
        .with_db(move |db| match db.get_subtask(id)? {
            Some(subtask) => db.toggle_subtask(id, subtask.task_id),
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Subtask not found"))?;

    Ok(Json(json!({ "success": true, "subtask": updated })))
}

/// DELETE /api/subtasks/:id - Remove a subtask.
async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .with_db(move |db| match db.get_subtask(id)? {
            Some(subtask) => db.delete_subtask(id, subtask.task_id),
            None => Ok(false),
        })
        .await?;

    if !deleted {
        return Err(ApiError::not_found("Subtask not found"));
    }
    Ok(Json(json!({ "success": true })))
}
