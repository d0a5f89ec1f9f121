/// Task endpoints
///
/// Every handler runs behind the JWT middleware and only touches tasks owned
/// by the caller. Lookups by id answer 404 before the ownership check, so a
/// foreign task id yields 403 rather than 404.
///
/// # Endpoints
///
/// - `GET /api/tasks` - List the caller's tasks, newest first
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks/:id` - Fetch one task
/// - `PUT /api/tasks/:id` - Partial update
/// - `PATCH /api/tasks/:id/toggle` - Flip `completed`
/// - `DELETE /api/tasks/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, StoreResultExt, ValidationErrorDetail},
    extract::JsonBody,
    routes::{DataResponse, MessageResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskdesk_shared::{
    auth::{
        authorization::{require_task_owner, TaskAction},
        middleware::AuthContext,
    },
    models::{
        priority::{normalize_priority, Priority},
        task::{
            format_task_for_frontend, parse_due_date, present, CreateTask, Task, TaskView,
            UpdateTask, MAX_TITLE_LENGTH,
        },
    },
};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Free text, normalized
    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub due_date: Option<String>,
}

/// Update task request
///
/// Absent fields are left alone. `description` and `dueDate` distinguish
/// absent from `null`; `null` clears them. A `null` title is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub completed: Option<bool>,

    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
}

fn invalid(field: &str, message: &str) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
}

/// Trimmed title, or the validation error to report
fn clean_title(raw: &str, empty_message: &str) -> ApiResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(invalid("title", empty_message));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(invalid("title", "Title too long"));
    }
    Ok(title.to_string())
}

/// Trimmed description; blank means none
fn clean_description(raw: &str) -> Option<String> {
    let description = raw.trim();
    (!description.is_empty()).then(|| description.to_string())
}

/// Empty means no due date
fn clean_due_date(raw: &str) -> ApiResult<Option<chrono::DateTime<chrono::Utc>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_due_date(raw)
        .map(Some)
        .map_err(|e| invalid("dueDate", &e.to_string()))
}

impl CreateTaskRequest {
    /// Validates and normalizes into a [`CreateTask`] for `user_id`
    pub fn into_create(self, user_id: Uuid) -> ApiResult<CreateTask> {
        let title = clean_title(self.title.as_deref().unwrap_or(""), "Title is required")?;

        let priority = match self.priority.as_deref() {
            Some(raw) if !raw.is_empty() => normalize_priority(raw),
            _ => Priority::Medium,
        };

        let due_date = match self.due_date.as_deref() {
            Some(raw) => clean_due_date(raw)?,
            None => None,
        };

        Ok(CreateTask {
            user_id,
            title,
            description: self.description.as_deref().and_then(clean_description),
            priority,
            due_date,
        })
    }
}

impl UpdateTaskRequest {
    /// Validates and normalizes into an [`UpdateTask`]
    pub fn into_update(self) -> ApiResult<UpdateTask> {
        let title = match self.title {
            None => None,
            Some(None) => return Err(invalid("title", "Title cannot be empty")),
            Some(Some(raw)) => Some(clean_title(&raw, "Title cannot be empty")?),
        };

        let due_date = match self.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => Some(clean_due_date(&raw)?),
        };

        Ok(UpdateTask {
            title,
            description: self
                .description
                .map(|d| d.as_deref().and_then(clean_description)),
            priority: self.priority.as_deref().map(normalize_priority),
            completed: self.completed,
            due_date,
        })
    }
}

/// Unparseable ids cannot name an existing task
fn parse_task_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Task not found".to_string()))
}

/// Loads a task and checks the caller may perform `action` on it
async fn owned_task(
    state: &AppState,
    auth: &AuthContext,
    raw_id: &str,
    action: TaskAction,
    context: &'static str,
) -> ApiResult<Task> {
    let id = parse_task_id(raw_id)?;

    let task = state
        .store
        .find_task(id)
        .await
        .context(context)?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_owner(auth, &task, action)?;
    Ok(task)
}

/// Lists the caller's tasks
///
/// # Response
///
/// ```json
/// { "success": true, "data": [ { "id": "uuid", "title": "...", "priority": "high", ... } ] }
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DataResponse<Vec<TaskView>>>> {
    let tasks = state
        .store
        .list_tasks(auth.user_id)
        .await
        .context("Error fetching tasks")?;

    tracing::debug!(user_id = %auth.user_id, count = tasks.len(), "Listed tasks");

    Ok(Json(DataResponse::new(
        tasks.iter().map(format_task_for_frontend).collect(),
    )))
}

/// Fetches one task
///
/// # Errors
///
/// - `404 Not Found`: No such task
/// - `403 Forbidden`: Task belongs to someone else
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<TaskView>>> {
    let task = owned_task(&state, &auth, &id, TaskAction::View, "Error fetching task").await?;
    Ok(Json(DataResponse::new(format_task_for_frontend(&task))))
}

/// Creates a task for the caller
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Content-Type: application/json
///
/// { "title": "Buy milk", "priority": "alta", "dueDate": "2025-06-01" }
/// ```
///
/// Priority is normalized (`alta` → HIGH, unknown → MEDIUM).
///
/// # Errors
///
/// - `400 Bad Request`: Title missing, blank or too long; unparseable due date
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<TaskView>>)> {
    let data = req.into_create(auth.user_id)?;

    let task = state
        .store
        .create_task(data)
        .await
        .context("Error creating task")?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(format_task_for_frontend(&task))),
    ))
}

/// Applies a partial update
///
/// # Errors
///
/// - `404 Not Found`: No such task
/// - `403 Forbidden`: Task belongs to someone else
/// - `400 Bad Request`: Blank title or unparseable due date
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> ApiResult<Json<DataResponse<TaskView>>> {
    let task = owned_task(&state, &auth, &id, TaskAction::Modify, "Error updating task").await?;
    let changes = req.into_update()?;

    let updated = state
        .store
        .update_task(task.id, changes)
        .await
        .context("Error updating task")?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(task_id = %updated.id, "Task updated");

    Ok(Json(DataResponse::new(format_task_for_frontend(&updated))))
}

/// Flips the completed flag
pub async fn toggle_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<TaskView>>> {
    let task = owned_task(&state, &auth, &id, TaskAction::Modify, "Error updating task").await?;

    let toggled = state
        .store
        .toggle_task(task.id)
        .await
        .context("Error updating task")?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(task_id = %toggled.id, completed = toggled.completed, "Task toggled");

    Ok(Json(DataResponse::new(format_task_for_frontend(&toggled))))
}

/// Deletes a task
///
/// # Response
///
/// ```json
/// { "success": true, "message": "Task deleted successfully" }
/// ```
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let task = owned_task(&state, &auth, &id, TaskAction::Delete, "Error deleting task").await?;

    state
        .store
        .delete_task(task.id)
        .await
        .context("Error deleting task")?;

    tracing::info!(task_id = %task.id, "Task deleted");

    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
