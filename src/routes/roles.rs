use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState, db,
    db::models::{
        api::ApiResponse,
        auth::{AuthUser, CreateRoleRequest, UpdateRoleRequest},
    },
    services::{RolesService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn list_roles(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| RolesService::list(conn, &ctx)).await {
        Ok(roles) => (StatusCode::OK, Json(ApiResponse::success(roles, "Roles retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateRoleRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| RolesService::create(conn, &ctx, &payload)).await {
        Ok(role) => (StatusCode::CREATED, Json(ApiResponse::created(role, "Role created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(role_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| RolesService::update(conn, &ctx, role_id, &payload)).await {
        Ok(role) => (StatusCode::OK, Json(ApiResponse::success(role, "Role updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(role_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| RolesService::delete(conn, &ctx, role_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Role deleted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
