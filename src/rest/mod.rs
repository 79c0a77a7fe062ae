// rest/mod.rs — the HTTP API server.
//
// Axum router over the shared AppContext. Bearer-token auth is enforced
// per-handler (see auth.rs); /api/health stays open.
//
// Endpoints:
//   GET    /api/health
//   POST   /api/nfc/scan
//   GET    /api/nfc/mappings
//   POST   /api/nfc/mappings
//   DELETE /api/nfc/mappings/{tag_id}
//   GET    /api/nfc/pings?limit=N
//   GET    /api/nfc/stats
//   GET    /api/tasks
//   POST   /api/tasks
//   GET    /api/tasks/{id}
//   PUT    /api/tasks/{id}/status
//   DELETE /api/tasks/{id}
//   POST   /api/tasks/sort
//   GET    /api/tasks/stats

pub mod auth;
pub mod error;
pub mod routes;

use anyhow::Result;
use axum::routing::{get, post, put};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.bind_address, ctx.config.port).parse()?;
    let router = build_router(ctx);

    info!("HTTP API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/health", get(routes::health::health))
        // NFC
        .route("/api/nfc/scan", post(routes::nfc::scan))
        .route(
            "/api/nfc/mappings",
            get(routes::nfc::list_mappings).post(routes::nfc::create_mapping),
        )
        .route(
            "/api/nfc/mappings/{tag_id}",
            axum::routing::delete(routes::nfc::delete_mapping),
        )
        .route("/api/nfc/pings", get(routes::nfc::recent_pings))
        .route("/api/nfc/stats", get(routes::nfc::nfc_stats))
        // Tasks
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task).delete(routes::tasks::delete_task),
        )
        .route(
            "/api/tasks/{id}/status",
            put(routes::tasks::update_task_status),
        )
        .route("/api/tasks/sort", post(routes::tasks::sort_tasks))
        .route("/api/tasks/stats", get(routes::tasks::task_stats))
        // The bundled web page may be served from another host on the LAN.
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
