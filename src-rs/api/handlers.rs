use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::TaskError;
use crate::task::{Task, TaskListItem, TaskManager, TaskStatus};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// `TaskError` as an HTTP response.
pub struct ApiError(TaskError);

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TaskError::NotFound { .. } => (StatusCode::NOT_FOUND, "not found".to_string()),
            TaskError::AlreadyExists { .. } => (StatusCode::CONFLICT, self.0.to_string()),
            TaskError::InvalidTransition { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Query for `/tasks/filter`. Values are kept raw so malformed numbers fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Deserialize, Default)]
pub struct FilterQuery {
    pub id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn handle_health() -> &'static str {
    "ok"
}

pub async fn handle_create(State(manager): State<TaskManager>) -> Result<Json<Task>, ApiError> {
    info!("create task request");
    let task = manager.create_task().map_err(|err| {
        error!(error = %err, "failed to create task");
        ApiError(err)
    })?;
    Ok(Json(task))
}

pub async fn handle_get(
    State(manager): State<TaskManager>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    info!(task_id = %id, "get task request");
    Ok(Json(manager.get_task(&id)?))
}

pub async fn handle_list(State(manager): State<TaskManager>) -> Json<Vec<TaskListItem>> {
    let mut tasks = manager.list_tasks();
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(tasks.iter().map(Task::to_list_item).collect())
}

pub async fn handle_filter(
    State(manager): State<TaskManager>,
    Query(query): Query<FilterQuery>,
) -> Json<Vec<Task>> {
    Json(filter_tasks(manager.list_tasks(), &query))
}

pub async fn handle_delete(
    State(manager): State<TaskManager>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!(task_id = %id, "delete task request");
    manager.delete_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_cancel(
    State(manager): State<TaskManager>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(task_id = %id, "cancel task request");
    manager.cancel_task(&id)?;
    Ok(Json(json!({"status": "canceled"})))
}

/// Exact id match, case-insensitive status match, then an `offset`/`limit`
/// page over tasks ordered by creation time.
pub fn filter_tasks(mut tasks: Vec<Task>, query: &FilterQuery) -> Vec<Task> {
    let id = query.id.as_deref().filter(|id| !id.is_empty());
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<TaskStatus>() {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(error = %err, "filter on unknown status");
                return Vec::new();
            }
        },
        None => None,
    };
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_LIMIT);
    let offset = query
        .offset
        .as_deref()
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(0);

    tasks.retain(|task| {
        id.map_or(true, |id| task.id == id) && status.map_or(true, |s| task.status == s)
    });
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    tasks.into_iter().skip(offset).take(limit).collect()
}
