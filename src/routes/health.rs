use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use diesel::{RunQueryDsl, sql_query};
use serde::Serialize;
use std::sync::Arc;

use crate::{AppState, cache, db, db::models::api::ApiResponse};

#[derive(Serialize, Debug, Clone)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize, Debug, Clone)]
pub struct ReadinessStatus {
    pub database: bool,
    pub redis: bool,
}

/// 存活探针，不访问外部依赖
pub async fn health() -> impl IntoResponse {
    let body = HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    };
    (StatusCode::OK, Json(ApiResponse::success(body, "Service is healthy")))
}

pub async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = db::run(&state.db, |conn| {
        sql_query("SELECT 1").execute(conn)?;
        Ok(())
    })
    .await
    .map_err(|e| tracing::warn!(error = %e, "Database readiness check failed"))
    .is_ok();

    let redis = cache::redis_health_check(&state.redis)
        .await
        .map_err(|e| tracing::warn!(error = %e, "Redis readiness check failed"))
        .unwrap_or(false);

    let status = ReadinessStatus { database, redis };
    if database && redis {
        (StatusCode::OK, Json(ApiResponse::success(status, "Service is ready")))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                code: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                message: "Service is not ready".to_string(),
                data: Some(status),
                errors: None,
                timestamp: chrono::Utc::now().to_rfc3339(),
            }),
        )
    }
}
