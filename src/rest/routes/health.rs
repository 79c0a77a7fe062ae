// rest/routes/health.rs — unauthenticated health/status endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::error::ApiError;
use crate::AppContext;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let task_stats = ctx.tasks.stats().await?;
    let mappings = ctx.mappings.list().await?;

    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": ctx.started_at.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "task_stats": task_stats,
        "nfc_stats": {
            "total_mappings": mappings.len(),
        },
        "hardware_enabled": ctx.sink.enabled(),
    })))
}
