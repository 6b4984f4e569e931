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
        auth::{AssignRolesRequest, AuthUser, CreateUserRequest, UpdateUserRequest, UserFilter},
    },
    services::{UsersService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| UsersService::list(conn, &ctx, &filter, page)).await {
        Ok(users) => (StatusCode::OK, Json(ApiResponse::success(users, "Users retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| UsersService::get(conn, &ctx, user_id)).await {
        Ok(user) => (StatusCode::OK, Json(ApiResponse::success(user, "User retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let cost = state.config.auth().bcrypt_cost;
    match db::run(&state.db, move |conn| UsersService::create(conn, &ctx, &payload, cost)).await {
        Ok(user) => (StatusCode::CREATED, Json(ApiResponse::created(user, "User created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| UsersService::update(conn, &ctx, user_id, &payload)).await {
        Ok(user) => (StatusCode::OK, Json(ApiResponse::success(user, "User updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// 停用账号，不做物理删除
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| UsersService::deactivate(conn, &ctx, user_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("User deactivated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn assign_roles(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRolesRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| {
        UsersService::assign_roles(conn, &ctx, user_id, &payload.role_ids)
    })
    .await
    {
        Ok(user) => (StatusCode::OK, Json(ApiResponse::success(user, "Roles assigned successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
