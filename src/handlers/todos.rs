use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::store::{Todo, TodoPatch};
use crate::AppState;

/// POST /todos - Create a todo owned by the authenticated user
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Json<Todo>, ApiError> {
    // Allow-list transform: only "text" is read from the body
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation_error("text is required"))?;

    let todo = state
        .todos
        .insert(Todo::new(text.to_string(), current.user.id))
        .await?;

    Ok(Json(todo))
}

/// GET /todos - List the authenticated user's todos
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let todos = state.todos.list_for_owner(current.user.id).await?;

    Ok(Json(json!({ "todos": todos })))
}

/// GET /todos/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;

    let todo = state
        .todos
        .find_owned(id, current.user.id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "todo": todo })))
}

/// PATCH /todos/:id
///
/// Only "text" and "completed" are read from the body; everything else the
/// client submits is dropped. completed/completed_at are overwritten on
/// every update: a JSON-boolean true stamps the completion time, any other
/// value (absent, false, or a non-boolean) clears both.
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;

    let mut patch = TodoPatch::default();

    if let Some(text) = body.get("text").and_then(Value::as_str) {
        patch.text = Some(text.to_string());
    }

    if body.get("completed").and_then(Value::as_bool) == Some(true) {
        patch.completed = true;
        patch.completed_at = Some(Utc::now());
    }

    let todo = state
        .todos
        .update_owned(id, current.user.id, patch)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "todo": todo })))
}

/// DELETE /todos/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;

    let todo = state
        .todos
        .delete_owned(id, current.user.id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(json!({ "todo": todo })))
}

/// A malformed id is indistinguishable from a missing record: both report
/// not found, and neither leaks store internals.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

fn not_found() -> ApiError {
    ApiError::not_found("todo not found")
}
