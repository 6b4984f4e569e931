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
        workflow::*,
    },
    services::{WorkflowsService, context::RequestContext, workflows_service::Lifecycle},
    validation::ValidatedJson,
};

// ---- templates ----

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<TemplateFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| WorkflowsService::list_templates(conn, &ctx, &filter, page)).await {
        Ok(list) => (StatusCode::OK, Json(ApiResponse::success(list, "Templates retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(template_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::get_template(conn, &ctx, template_id)).await {
        Ok(template) => (StatusCode::OK, Json(ApiResponse::success(template, "Template retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateTemplateRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::create_template(conn, &ctx, &payload)).await {
        Ok(template) => (StatusCode::CREATED, Json(ApiResponse::created(template, "Template created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(template_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTemplateRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| {
        WorkflowsService::update_template(conn, &ctx, template_id, &payload)
    })
    .await
    {
        Ok(template) => (StatusCode::OK, Json(ApiResponse::success(template, "Template updated successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(template_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::delete_template(conn, &ctx, template_id)).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok("Template deleted successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

// ---- instances ----

pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<InstanceFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| WorkflowsService::list_instances(conn, &ctx, &filter, page)).await {
        Ok(list) => (StatusCode::OK, Json(ApiResponse::success(list, "Workflow instances retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateInstanceRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::create_instance(conn, &ctx, &payload)).await {
        Ok(instance) => (StatusCode::CREATED, Json(ApiResponse::created(instance, "Workflow instance created successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::get_instance(conn, &ctx, instance_id)).await {
        Ok(detail) => (StatusCode::OK, Json(ApiResponse::success(detail, "Workflow instance retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn start_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::start_instance(conn, &ctx, instance_id)).await {
        Ok(instance) => (StatusCode::OK, Json(ApiResponse::success(instance, "Workflow started"))).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn lifecycle(
    state: Arc<AppState>,
    auth_user: AuthUser,
    instance_id: Uuid,
    action: Lifecycle,
    payload: LifecycleRequest,
    message: &'static str,
) -> axum::response::Response {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| {
        WorkflowsService::change_lifecycle(conn, &ctx, instance_id, action, &payload)
    })
    .await
    {
        Ok(instance) => (StatusCode::OK, Json(ApiResponse::success(instance, message))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn suspend_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
    payload: Option<Json<LifecycleRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    lifecycle(state, auth_user, instance_id, Lifecycle::Suspend, payload, "Workflow suspended").await
}

pub async fn resume_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
    payload: Option<Json<LifecycleRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    lifecycle(state, auth_user, instance_id, Lifecycle::Resume, payload, "Workflow resumed").await
}

pub async fn terminate_instance(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
    payload: Option<Json<LifecycleRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    lifecycle(state, auth_user, instance_id, Lifecycle::Terminate, payload, "Workflow terminated").await
}

pub async fn instance_nodes(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::nodes(conn, &ctx, instance_id)).await {
        Ok(nodes) => (StatusCode::OK, Json(ApiResponse::success(nodes, "Workflow nodes retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn instance_transitions(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(instance_id): Path<Uuid>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::transitions(conn, &ctx, instance_id)).await {
        Ok(list) => (StatusCode::OK, Json(ApiResponse::success(list, "Workflow transitions retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

// ---- tasks ----

pub async fn my_tasks(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<MyTaskFilter>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    let page = page.normalize();
    match db::run(&state.db, move |conn| WorkflowsService::my_tasks(conn, &ctx, &filter, page)).await {
        Ok(tasks) => (StatusCode::OK, Json(ApiResponse::success(tasks, "Tasks retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(node_id): Path<Uuid>,
    Json(payload): Json<CompleteTaskRequest>,
) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::complete_task(conn, &ctx, node_id, &payload)).await {
        Ok(instance) => (StatusCode::OK, Json(ApiResponse::success(instance, "Task completed"))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn workflow_stats(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> impl IntoResponse {
    let ctx = RequestContext::from(&auth_user);
    match db::run(&state.db, move |conn| WorkflowsService::stats(conn, &ctx)).await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats, "Workflow statistics retrieved successfully"))).into_response(),
        Err(err) => err.into_response(),
    }
}
