use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState, db,
    db::models::{
        api::{ApiResponse, PageQuery},
        auth::AuthUser,
        department::{CreateDepartmentRequest, DepartmentFilter, UpdateDepartmentRequest},
    },
    services::{DepartmentsService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<DepartmentFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| DepartmentsService::list(conn, &ctx, &filter, page)).await {
        Ok(list) => (StatusCode::OK, Json(ApiResponse::success(list, "Departments retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_department(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(dept_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| DepartmentsService::get(conn, &ctx, dept_id)).await {
        Ok(dept) => (StatusCode::OK, Json(ApiResponse::success(dept, "Department retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateDepartmentRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| DepartmentsService::create(conn, &ctx, &payload)).await {
        Ok(dept) => (StatusCode::CREATED, Json(ApiResponse::created(dept, "Department created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_department(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(dept_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateDepartmentRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| DepartmentsService::update(conn, &ctx, dept_id, &payload)).await {
        Ok(dept) => (StatusCode::OK, Json(ApiResponse::success(dept, "Department updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(dept_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| DepartmentsService::delete(conn, &ctx, dept_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Department deleted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
