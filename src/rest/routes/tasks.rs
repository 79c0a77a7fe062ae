// rest/routes/tasks.rs — task CRUD, status cycling, sort, and stats.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::hardware;
use crate::rest::auth::require_auth;
use crate::rest::error::ApiError;
use crate::store::{NewTask, SortBy, TaskStatus};
use crate::AppContext;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<u8>,
    pub include_subtasks: Option<bool>,
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    let status_filter = q
        .status
        .map(TaskStatus::try_from)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let mut tasks = ctx.tasks.list().await?;
    let total_count = tasks.len();
    if let Some(status) = status_filter {
        tasks.retain(|t| t.status == status);
    }
    if !q.include_subtasks.unwrap_or(true) {
        for task in &mut tasks {
            task.subtasks.clear();
        }
    }

    Ok(Json(json!({
        "tasks": tasks,
        "total_count": total_count,
        "filtered_count": tasks.len(),
    })))
}

#[derive(Deserialize)]
pub struct CreateTaskBody {
    pub title: Option<String>,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub effort: u8,
    pub due_date: Option<NaiveDate>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_auth(&ctx, &headers)?;

    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing task title".to_string()))?;

    let task = ctx
        .tasks
        .add(NewTask {
            title: title.to_string(),
            priority: body.priority,
            effort: body.effort,
            due_date: body.due_date,
        })
        .await?;
    hardware::dispatch(&ctx.sink, task.id, task.status);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "created",
            "task_index": task.id,
            "title": task.title,
        })),
    ))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(task_id): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    match ctx.tasks.get(task_id).await? {
        Some(task) => Ok(Json(json!({ "task": task }))),
        None => Err(ApiError::TaskNotFound(task_id)),
    }
}

#[derive(Deserialize, Default)]
pub struct UpdateStatusBody {
    pub status: Option<u8>,
}

/// An empty body cycles the status; `{"status": N}` sets it outright.
pub async fn update_task_status(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(task_id): Path<usize>,
    body: Option<Json<UpdateStatusBody>>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    let explicit = body
        .and_then(|Json(b)| b.status)
        .map(TaskStatus::try_from)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let new_status = ctx
        .tasks
        .set_status(task_id, explicit)
        .await?
        .ok_or(ApiError::TaskNotFound(task_id))?;
    hardware::dispatch(&ctx.sink, task_id, new_status);

    Ok(Json(json!({
        "status": "updated",
        "task_id": task_id,
        "new_status": new_status,
        "status_name": new_status.name(),
    })))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(task_id): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    if !ctx.tasks.remove(task_id).await? {
        return Err(ApiError::TaskNotFound(task_id));
    }
    Ok(Json(json!({
        "status": "deleted",
        "task_id": task_id,
    })))
}

#[derive(Deserialize, Default)]
pub struct SortBody {
    pub sort_by: Option<String>,
}

pub async fn sort_tasks(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Option<Json<SortBody>>,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    let sort_by = body
        .and_then(|Json(b)| b.sort_by)
        .unwrap_or_else(|| "priority".to_string());
    let by: SortBy = sort_by.parse().map_err(ApiError::BadRequest)?;

    ctx.tasks.sort(by).await?;
    Ok(Json(json!({
        "status": "sorted",
        "sort_by": sort_by,
    })))
}

pub async fn task_stats(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_auth(&ctx, &headers)?;

    let stats = ctx.tasks.stats().await?;
    Ok(Json(json!({ "stats": stats })))
}
