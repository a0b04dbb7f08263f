//! Task endpoints.
//!
//! - GET    /api/tasks?board_id=N         board with columns and tasks
//! - POST   /api/tasks                    create a task
//! - GET    /api/tasks/:id                task with subtasks and activity log
//! - PUT    /api/tasks/:id                move or update a task
//! - DELETE /api/tasks/:id                delete a task
//! - GET    /api/tasks/:id/subtasks       subtasks of a task
//! - POST   /api/tasks/:id/subtasks       add a subtask

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::db::{BoardWithColumns, Priority, Subtask, Task, TaskChanges, TaskDetail, TaskEdit};

use super::routes::AppState;
use super::{ApiError, ApiJson};

/// Board shown when the request does not name one.
const DEFAULT_BOARD_ID: i64 = 1;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_board_data).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/:id/subtasks", get(list_subtasks).post(create_subtask))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub board_id: Option<String>,
}

impl BoardQuery {
    /// Missing, unparseable and zero ids all fall back to the default board.
    fn board_id(&self) -> i64 {
        self.board_id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id != 0)
            .unwrap_or(DEFAULT_BOARD_ID)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub column_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Body of PUT /api/tasks/:id.
///
/// Nullable fields distinguish "absent" (outer `None`) from "set to null"
/// (`Some(None)`).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(rename = "moveToColumn")]
    pub move_to_column: Option<i64>,
    #[serde(rename = "newPosition")]
    pub new_position: Option<i64>,

    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub column_id: Option<i64>,
    pub position: Option<i64>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    /// A move needs both move keys; anything else is a field update.
    pub fn into_edit(self) -> TaskEdit {
        if let (Some(column_id), Some(position)) = (self.move_to_column, self.new_position) {
            return TaskEdit::Move {
                column_id,
                position,
            };
        }

        TaskEdit::for_changes(TaskChanges {
            title: self.title,
            description: self.description,
            column_id: self.column_id,
            position: self.position,
            priority: self.priority,
            due_date: self.due_date,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    #[serde(default)]
    pub title: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/tasks - Board data for `board_id` (default 1).
async fn get_board_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<BoardWithColumns>, ApiError> {
    let board_id = query.board_id();
    state
        .with_db(move |db| db.get_board_data(board_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Board not found"))
}

/// POST /api/tasks - Append a task to a column.
async fn create_task(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let task = state
        .with_db(move |db| {
            db.create_task(
                req.column_id,
                &title,
                req.description.as_deref(),
                req.priority.unwrap_or_default(),
            )
        })
        .await?;

    tracing::info!(task_id = task.id, column_id = task.column_id, "Created task");
    Ok(Json(task))
}

/// GET /api/tasks/:id - Task with subtasks and activity log.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetail>, ApiError> {
    state
        .with_db(move |db| db.get_task_detail(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// PUT /api/tasks/:id - Move or update a task.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let edit = req.into_edit();
    tracing::debug!(task_id = id, edit = ?edit, "Editing task");

    let task = state
        .with_db(move |db| db.edit_task(id, &edit))
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(json!({ "success": true, "task": task })))
}

/// DELETE /api/tasks/:id - Delete a task with its subtasks and activity.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.with_db(move |db| db.delete_task(id)).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    tracing::info!(task_id = id, "Deleted task");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/tasks/:id/subtasks - Subtasks ordered by position.
async fn list_subtasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Subtask>>, ApiError> {
    let subtasks = state
        .with_db(move |db| match db.get_task(id)? {
            Some(_) => db.get_subtasks(id).map(Some),
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(subtasks))
}

/// POST /api/tasks/:id/subtasks - Add a subtask.
async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<CreateSubtaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let title = req.title.unwrap_or_default();
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let subtask = state
        .with_db(move |db| match db.get_task(id)? {
            Some(_) => db.create_subtask(id, &title).map(Some),
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(json!({ "success": true, "subtask": subtask })))
}
