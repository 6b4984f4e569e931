use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState, db,
    db::models::{
        api::{ApiResponse, PageQuery},
        auth::AuthUser,
        notification::{NotificationFilter, SendBulkRequest},
    },
    services::{NotificationsService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<NotificationFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| NotificationsService::list(conn, &ctx, &filter, page)).await {
        Ok(list) => (StatusCode::OK, Json(ApiResponse::success(list, "Notifications retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn notification_stats(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::stats(conn, &ctx)).await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats, "Notification statistics retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::mark_read(conn, &ctx, notification_id)).await {
        Ok(n) => (StatusCode::OK, Json(ApiResponse::success(n, "Notification marked as read"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn mark_all_read(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::mark_all_read(conn, &ctx)).await {
        Ok(count) => (StatusCode::OK, Json(ApiResponse::success(json!({ "count": count }), "Notifications marked as read"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::confirm(conn, &ctx, notification_id)).await {
        Ok(n) => (StatusCode::OK, Json(ApiResponse::success(n, "Notification confirmed"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::delete(conn, &ctx, notification_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Notification deleted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn send_bulk(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<SendBulkRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::send_bulk(conn, &ctx, &payload)).await {
        Ok(result) => (StatusCode::CREATED, Json(ApiResponse::created(result, "Notifications sent"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn retry_failed(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::retry_failed(conn, &ctx)).await {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary, "Failed notifications retried"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cleanup_expired(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| NotificationsService::cleanup_expired(conn, &ctx)).await {
        Ok(count) => (StatusCode::OK, Json(ApiResponse::success(json!({ "cleaned": count }), "Expired notifications cleaned"))).into_response(),
        Err(err) => err.into_response(),
    }
}
