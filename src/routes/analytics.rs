use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    AppState, db,
    db::models::{api::ApiResponse, auth::AuthUser, supervision::SupervisionFilter},
    services::{AnalyticsService, context::RequestContext},
};

pub async fn overview(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| AnalyticsService::overview(conn, &ctx)).await {
        Ok(overview) => (StatusCode::OK, Json(ApiResponse::success(overview, "Overview retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(filter): Query<SupervisionFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| AnalyticsService::export(conn, &ctx, &filter)).await {
        Ok(file) => {
            tracing::info!(user_id = %auth_user.id, filename = %file.filename, "Supervision items exported");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file.filename),
                    ),
                ],
                file.content,
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
