use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::metrics::get_metrics;
use crate::AppState;

/// Liveness: the process is up and serving.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": state.config.service_version,
    }))
}

/// Readiness: the store answers a ping.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mongodb = match &state.db {
        Some(db) => {
            db.health_check().await?;
            "up"
        }
        None => "in-memory",
    };

    Ok(Json(json!({
        "status": "ready",
        "environment": format!("{:?}", state.config.environment),
        "checks": { "mongodb": mongodb }
    })))
}

pub async fn metrics() -> impl IntoResponse {
    get_metrics()
}
