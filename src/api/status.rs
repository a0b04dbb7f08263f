use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::status;

use super::routes::AppState;

/// GET /api/status - Classify the most recent agent session by age.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Response {
    match status::probe(state.status_source.as_ref()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::warn!("Status probe failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to get agent status",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
