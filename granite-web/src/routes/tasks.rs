/// Task endpoints
///
/// All routes require a session; role checks happen in [`TaskService`].
///
/// # Endpoints
///
/// - `GET /v1/tasks?status=&search=&sort=` - Visible tasks, filtered and sorted
/// - `POST /v1/tasks` - Create a task (org admin and above)
/// - `GET /v1/tasks/stats` - Counters over visible tasks
/// - `PUT /v1/tasks/:id` - Edit a task (org admin and above)
/// - `PATCH /v1/tasks/:id/status` - Change status (anyone who can see it)
/// - `DELETE /v1/tasks/:id?confirm=true` - Delete a task

use crate::{
    error::{ApiError, ApiResult},
    routes::MessageResponse,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use granite_shared::{
    auth::resolver::Caller,
    client::Client,
    models::task::{Task, TaskPriority, TaskStatus},
    tasks::{
        view::{display_name, filter_and_sort},
        workflow::parse_deadline,
        Assignment, SortKey, StatusFilter, TaskDraft, TaskService, TaskStats, TaskWrite,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// `all` or a status name
    #[serde(default)]
    pub status: Option<String>,

    /// Case-insensitive match on title or description
    #[serde(default)]
    pub search: Option<String>,

    /// `deadline`, `priority` or `created_at`
    #[serde(default)]
    pub sort: Option<String>,
}

/// Task as listed, with presentation fields
#[derive(Debug, Serialize)]
pub struct TaskItem {
    #[serde(flatten)]
    pub task: Task,

    pub assignee_name: String,
    pub overdue: bool,
}

/// Task list
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub heading: String,
    pub caption: String,
    pub tasks: Vec<TaskItem>,
}

/// Task form as submitted
///
/// The deadline is the raw form value (`YYYY-MM-DDTHH:MM`, RFC 3339 or a
/// bare date). `assign_by_email` picks which of `assigned_to` and
/// `assignee_email` is used.
#[derive(Debug, Default, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub deadline: String,

    #[serde(default)]
    pub assigned_to: Option<Uuid>,

    #[serde(default)]
    pub assignee_email: String,

    #[serde(default)]
    pub assign_by_email: bool,
}

impl TaskRequest {
    fn into_draft(self) -> TaskDraft {
        let assignment = if self.assign_by_email {
            Assignment::Email(self.assignee_email)
        } else {
            Assignment::Id(self.assigned_to)
        };

        TaskDraft {
            title: self.title,
            description: self.description,
            priority: self.priority,
            deadline: parse_deadline(&self.deadline),
            assignment,
        }
    }
}

/// Status change
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// Status change result
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub task: Task,
    pub message: &'static str,
}

/// Delete query
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// List visible tasks
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status filter or sort key
/// - `502 Bad Gateway`: "Failed to load tasks."
pub async fn list_tasks(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<TaskListResponse>> {
    let filter: StatusFilter = params
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;
    let sort: SortKey = params
        .sort
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;

    let service = TaskService::new(client);
    let tasks = service.list(&caller).await?;
    let users = service.assignable_users(&caller).await;

    let shown = filter_and_sort(&tasks, filter, params.search.as_deref().unwrap_or_default(), sort);
    let now = Utc::now();

    Ok(Json(TaskListResponse {
        heading: filter.heading(),
        caption: filter.caption(shown.len()),
        tasks: shown
            .into_iter()
            .map(|task| TaskItem {
                assignee_name: display_name(&task, &users),
                overdue: task.is_overdue_at(now),
                task,
            })
            .collect(),
    }))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Missing title or deadline, bad assignee email
/// - `403 Forbidden`: "You are not authorized to add tasks."
/// - `502 Bad Gateway`: Lookup or insert failed
pub async fn create_task(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskWrite>)> {
    let written = TaskService::new(client).create(&caller, &req.into_draft()).await?;
    Ok((StatusCode::CREATED, Json(written)))
}

/// Counters over the caller's visible tasks
pub async fn task_stats(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<TaskStats>> {
    let tasks = TaskService::new(client).list(&caller).await?;
    Ok(Json(TaskStats::compute(&tasks, Utc::now())))
}

/// Edit a task; its status is left alone
pub async fn update_task(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<TaskWrite>> {
    let written = TaskService::new(client)
        .update(&caller, id, &req.into_draft())
        .await?;
    Ok(Json(written))
}

/// Move a task to any status
pub async fn update_task_status(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let task = TaskService::new(client)
        .update_status(&caller, id, req.status)
        .await?;
    Ok(Json(StatusResponse {
        task,
        message: "Task status updated!",
    }))
}

/// Delete a task; admin tier only, and `confirm=true` is required
pub async fn delete_task(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<MessageResponse>> {
    TaskService::new(client)
        .delete(&caller, id, params.confirm.into())
        .await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
