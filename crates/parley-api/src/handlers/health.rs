//! Health check handlers.

use axum::Json;
use axum::extract::State;

use parley_core::traits::PresenceDirectory;
use parley_realtime::timeout::with_timeout;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let limit = state.realtime.config().operation_timeout();
    let database_ok = with_timeout(limit, "database health", state.database.health_check())
        .await
        .unwrap_or(false);
    let directory_ok = with_timeout(
        limit,
        "directory health",
        state.realtime.directory().health_check(),
    )
    .await
    .unwrap_or(false);

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: if database_ok && directory_ok { "ok" } else { "degraded" }.to_string(),
        instance_id: state.realtime.instance_id.clone(),
        database: reachability(database_ok),
        directory: reachability(directory_ok),
        connections: state.realtime.registry.connection_count(),
    }))
}

fn reachability(ok: bool) -> String {
    if ok { "connected" } else { "unreachable" }.to_string()
}
