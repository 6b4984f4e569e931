use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    cache::{self, MONITORING_STATS_KEY},
    db,
    db::models::{
        api::{ApiResponse, PageQuery},
        auth::AuthUser,
        monitoring::{AlertFilter, MonitoringStats},
    },
    services::{
        MonitoringService,
        context::{RequestContext, permissions},
    },
};

/// 统计结果缓存在 Redis，扫描后失效
pub async fn stats(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    if let Err(err) = ctx.require(permissions::SUPERVISION_READ) {
        return err.into_response();
    }

    if let Some(cached) = cache::get_cache::<MonitoringStats>(&state.redis, MONITORING_STATS_KEY).await {
        return (StatusCode::OK, Json(ApiResponse::success(cached, "Monitoring statistics retrieved successfully")))
            .into_response();
    }

    let settings = state.config.monitoring();
    let ttl = settings.stats_cache_ttl;
    match db::run(&state.db, move |conn| MonitoringService::stats(conn, &ctx, &settings)).await {
        Ok(stats) => {
            if let Err(e) = cache::set_cache(&state.redis, MONITORING_STATS_KEY, &stats, ttl).await {
                tracing::warn!(error = %e, "Failed to cache monitoring stats");
            }
            (StatusCode::OK, Json(ApiResponse::success(stats, "Monitoring statistics retrieved successfully")))
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<AlertFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| MonitoringService::list_alerts(conn, &ctx, &filter, page)).await {
        Ok(alerts) => (StatusCode::OK, Json(ApiResponse::success(alerts, "Alerts retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(alert_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| MonitoringService::resolve_alert(conn, &ctx, alert_id)).await {
        Ok(alert) => {
            invalidate_stats(&state).await;
            (StatusCode::OK, Json(ApiResponse::success(alert, "Alert resolved"))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn scan(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let settings = state.config.monitoring();
    match db::run(&state.db, move |conn| MonitoringService::scan(conn, &ctx, &settings)).await {
        Ok(summary) => {
            invalidate_stats(&state).await;
            (StatusCode::OK, Json(ApiResponse::success(summary, "Monitoring scan completed"))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn update_overdue_status(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| MonitoringService::update_overdue_status(conn, &ctx)).await {
        Ok(updated) => {
            invalidate_stats(&state).await;
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    serde_json::json!({ "updated": updated }),
                    "Overdue status updated",
                )),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn department_risk(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(dept_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| MonitoringService::department_risk(conn, &ctx, dept_id)).await {
        Ok(risk) => (StatusCode::OK, Json(ApiResponse::success(risk, "Risk analysis retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn dashboard(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let settings = state.config.monitoring();
    match db::run(&state.db, move |conn| MonitoringService::dashboard(conn, &ctx, &settings)).await {
        Ok(board) => (StatusCode::OK, Json(ApiResponse::success(board, "Dashboard retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn invalidate_stats(state: &AppState) {
    if let Err(e) = cache::delete_cache(&state.redis, MONITORING_STATS_KEY).await {
        tracing::warn!(error = %e, "Failed to invalidate monitoring stats cache");
    }
}
