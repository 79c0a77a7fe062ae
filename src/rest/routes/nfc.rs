// rest/routes/nfc.rs — scans, tag mappings, and the scan log.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::rest::auth::require_nfc_auth;
use crate::rest::error::ApiError;
use crate::scan::ScanRequest;
use crate::store::NewTask;
use crate::AppContext;

const DEFAULT_PINGS_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct ScanBody {
    pub tag_id: Option<String>,
    pub task_title: Option<String>,
    pub reader: Option<String>,
}

pub async fn scan(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<ScanBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    let tag_id = body
        .tag_id
        .ok_or_else(|| ApiError::BadRequest("missing tag_id".to_string()))?;

    let outcome = ctx
        .engine
        .scan(ScanRequest {
            tag_id,
            task_title: body.task_title,
            reader: body.reader,
        })
        .await?;

    let code = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        code,
        Json(json!({
            "status": outcome.action.as_str(),
            "tag_id": outcome.tag_id,
            "task_title": outcome.task_title,
            "task_index": outcome.task_index,
            "new_status": outcome.new_status,
            "status_name": outcome.new_status.name(),
        })),
    ))
}

pub async fn list_mappings(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    let mappings = ctx.mappings.list().await?;
    Ok(Json(json!({ "mappings": mappings })))
}

#[derive(Deserialize)]
pub struct CreateMappingBody {
    pub tag_id: Option<String>,
    pub task_title: Option<String>,
}

/// Map a tag without cycling anything; creates the task if it is missing.
pub async fn create_mapping(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<CreateMappingBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    let (Some(tag_id), Some(task_title)) = (body.tag_id, body.task_title) else {
        return Err(ApiError::BadRequest(
            "missing tag_id or task_title".to_string(),
        ));
    };

    let task = match ctx.tasks.find_by_title(&task_title).await? {
        Some(task) => task,
        None => ctx.tasks.add(NewTask::titled(task_title.clone())).await?,
    };
    ctx.mappings.upsert(&tag_id, &task.title).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "mapping_created",
            "tag_id": tag_id,
            "task_title": task.title,
            "task_index": task.id,
        })),
    ))
}

pub async fn delete_mapping(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(tag_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    if !ctx.mappings.remove(&tag_id).await? {
        return Err(ApiError::MappingNotFound(tag_id));
    }
    Ok(Json(json!({
        "status": "mapping_deleted",
        "tag_id": tag_id,
    })))
}

#[derive(Deserialize)]
pub struct PingsQuery {
    pub limit: Option<usize>,
}

pub async fn recent_pings(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(q): Query<PingsQuery>,
) -> Result<Json<Value>, ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    let limit = q.limit.unwrap_or(DEFAULT_PINGS_LIMIT);
    let pings = ctx.scan_log.recent(limit).await?;
    Ok(Json(json!({
        "count": pings.len(),
        "pings": pings,
    })))
}

pub async fn nfc_stats(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_nfc_auth(&ctx, &headers)?;

    let mappings = ctx.mappings.list().await?;
    let unique_tasks: std::collections::BTreeSet<&str> =
        mappings.values().map(String::as_str).collect();

    // Which tag showed up most across the last 100 scans.
    let recent = ctx.scan_log.recent(100).await?;
    let mut usage: HashMap<&str, usize> = HashMap::new();
    for ping in &recent {
        *usage.entry(ping.tag_id.as_str()).or_default() += 1;
    }
    let most_used = usage.iter().max_by_key(|(_, count)| **count).map(
        |(tag_id, count)| {
            json!({
                "tag_id": tag_id,
                "usage_count": count,
                "mapped_task": mappings.get(*tag_id),
            })
        },
    );

    Ok(Json(json!({
        "stats": {
            "total_mappings": mappings.len(),
            "unique_tasks": unique_tasks.len(),
            "recent_pings": recent.len(),
            "most_used_tag": most_used,
        }
    })))
}
