use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState, db,
    db::models::{
        api::{ApiResponse, PageQuery},
        auth::AuthUser,
        supervision::*,
    },
    services::{SupervisionService, context::RequestContext},
    validation::ValidatedJson,
};

#[derive(Deserialize, Debug, Default)]
pub struct StatsQuery {
    pub department_id: Option<Uuid>,
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<SupervisionFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| SupervisionService::list(conn, &ctx, &filter, page)).await {
        Ok(items) => (StatusCode::OK, Json(ApiResponse::success(items, "Supervision items retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateSupervisionRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::create(conn, &ctx, &payload)).await {
        Ok(item) => (StatusCode::CREATED, Json(ApiResponse::created(item, "Supervision item created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::get(conn, &ctx, item_id)).await {
        Ok(detail) => (StatusCode::OK, Json(ApiResponse::success(detail, "Supervision item retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSupervisionRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::update(conn, &ctx, item_id, &payload)).await {
        Ok(item) => (StatusCode::OK, Json(ApiResponse::success(item, "Supervision item updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::delete(conn, &ctx, item_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Supervision item deleted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::change_status(conn, &ctx, item_id, &payload)).await {
        Ok(item) => (StatusCode::OK, Json(ApiResponse::success(item, "Status updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn evaluate_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<EvaluateRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::evaluate(conn, &ctx, item_id, &payload)).await {
        Ok(item) => (StatusCode::OK, Json(ApiResponse::success(item, "Evaluation saved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn item_logs(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::logs(conn, &ctx, item_id)).await {
        Ok(logs) => (StatusCode::OK, Json(ApiResponse::success(logs, "Status logs retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn overdue_items(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::overdue_items(conn, &ctx)).await {
        Ok(items) => (StatusCode::OK, Json(ApiResponse::success(items, "Overdue items retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn urgent_items(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::urgent_items(conn, &ctx)).await {
        Ok(items) => (StatusCode::OK, Json(ApiResponse::success(items, "Urgent items retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn stats_overview(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::stats(conn, &ctx, query.department_id)).await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats, "Statistics retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn stats_departments(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::department_stats(conn, &ctx)).await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats, "Department statistics retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

// ---- tasks ----

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::list_tasks(conn, &ctx, item_id)).await {
        Ok(tasks) => (StatusCode::OK, Json(ApiResponse::success(tasks, "Tasks retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateTaskRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::create_task(conn, &ctx, item_id, &payload)).await {
        Ok(task) => (StatusCode::CREATED, Json(ApiResponse::created(task, "Task assigned successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(task_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTaskRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::update_task(conn, &ctx, task_id, &payload)).await {
        Ok(task) => (StatusCode::OK, Json(ApiResponse::success(task, "Task updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn accept_task(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(task_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::accept_task(conn, &ctx, task_id)).await {
        Ok(task) => (StatusCode::OK, Json(ApiResponse::success(task, "Task accepted"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(task_id): Path<Uuid>,
    payload: Option<Json<CompleteTaskAssignmentRequest>>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    match db::run(&state.db, move |conn| SupervisionService::complete_task(conn, &ctx, task_id, &payload)).await {
        Ok(task) => (StatusCode::OK, Json(ApiResponse::success(task, "Task completed"))).into_response(),
        Err(err) => err.into_response(),
    }
}

// ---- progress reports ----

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| SupervisionService::list_reports(conn, &ctx, item_id, page)).await {
        Ok(reports) => (StatusCode::OK, Json(ApiResponse::success(reports, "Reports retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateReportRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::create_report(conn, &ctx, item_id, &payload)).await {
        Ok(report) => (StatusCode::CREATED, Json(ApiResponse::created(report, "Report submitted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_report(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(report_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateReportRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| SupervisionService::update_report(conn, &ctx, report_id, &payload)).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report, "Report updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
