use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::{
    AppState, cache, db,
    db::models::{
        api::ApiResponse,
        auth::{AuthUser, ChangePasswordRequest, LoginRequest, RefreshTokenRequest},
    },
    error::AppError,
    middleware::auth::{REFRESH_TOKEN_TYPE, revocation_ttl, unix_now},
    services::{AuthService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> impl IntoResponse {
    let username = payload.username.clone();
    let result = db::run(&state.db, move |conn| AuthService::authenticate(conn, &payload)).await;

    let response = result.and_then(|(user, roles)| AuthService::issue_tokens(&state.tokens, &user, &roles));
    match response {
        Ok(tokens) => {
            tracing::info!(user_id = %tokens.user.id, "User logged in");
            (StatusCode::OK, Json(ApiResponse::success(tokens, "Login successful"))).into_response()
        }
        Err(err) => {
            tracing::warn!(username = %username, error = %err, "Login failed");
            err.into_response()
        }
    }
}

/// 刷新令牌一次性使用：签发新令牌对后吊销旧的 refresh token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> impl IntoResponse {
    let claims = match state.tokens.verify(&payload.refresh_token, REFRESH_TOKEN_TYPE) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    match cache::is_token_revoked(&state.redis, &claims.jti).await {
        Ok(true) => return AppError::auth("Refresh token has been revoked").into_response(),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Token revocation check skipped"),
    }

    let user_id = claims.sub;
    let loaded = db::run(&state.db, move |conn| AuthService::load_active_user(conn, user_id)).await;
    let tokens = match loaded.and_then(|(user, roles)| AuthService::issue_tokens(&state.tokens, &user, &roles)) {
        Ok(tokens) => tokens,
        Err(err) => return err.into_response(),
    };

    if let Err(e) = cache::revoke_token(&state.redis, &claims.jti, claims.revocation_ttl(unix_now())).await {
        tracing::warn!(error = %e, "Failed to revoke rotated refresh token");
    }

    (StatusCode::OK, Json(ApiResponse::success(tokens, "Token refreshed"))).into_response()
}

pub async fn logout(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ttl = revocation_ttl(auth_user.token_exp, unix_now());
    match cache::revoke_token(&state.redis, &auth_user.token_jti, ttl).await {
        Ok(()) => {
            tracing::info!(user_id = %auth_user.id, "User logged out");
            (StatusCode::OK, Json(ApiResponse::<()>::ok("Logout successful"))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn me(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| AuthService::profile(conn, &ctx)).await {
        Ok(info) => (StatusCode::OK, Json(ApiResponse::success(info, "Profile retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let cost = state.config.auth().bcrypt_cost;
    match db::run(&state.db, move |conn| AuthService::change_password(conn, &ctx, &payload, cost)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Password changed successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
