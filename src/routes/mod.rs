pub mod analytics;
pub mod auth;
pub mod departments;
pub mod health;
pub mod monitoring;
pub mod notifications;
pub mod roles;
pub mod supervision;
pub mod users;
pub mod workflows;

use crate::AppState;
use crate::middleware::{auth_middleware, request_tracking_middleware};
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const API_PREFIX: &str = "/api/v1";

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        // auth
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        // users & roles
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:user_id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:user_id/roles", put(users::assign_roles))
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/:role_id", put(roles::update_role).delete(roles::delete_role))
        // departments
        .route(
            "/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/departments/:dept_id",
            get(departments::get_department)
                .put(departments::update_department)
                .delete(departments::delete_department),
        )
        // supervision
        .route(
            "/supervision",
            get(supervision::list_items).post(supervision::create_item),
        )
        .route("/supervision/overdue", get(supervision::overdue_items))
        .route("/supervision/urgent", get(supervision::urgent_items))
        .route("/supervision/stats/overview", get(supervision::stats_overview))
        .route("/supervision/stats/departments", get(supervision::stats_departments))
        .route(
            "/supervision/:item_id",
            get(supervision::get_item)
                .put(supervision::update_item)
                .delete(supervision::delete_item),
        )
        .route("/supervision/:item_id/status", post(supervision::change_status))
        .route("/supervision/:item_id/evaluate", post(supervision::evaluate_item))
        .route("/supervision/:item_id/logs", get(supervision::item_logs))
        .route(
            "/supervision/:item_id/tasks",
            get(supervision::list_tasks).post(supervision::create_task),
        )
        .route(
            "/supervision/:item_id/reports",
            get(supervision::list_reports).post(supervision::create_report),
        )
        .route("/supervision/tasks/:task_id", put(supervision::update_task))
        .route("/supervision/tasks/:task_id/accept", post(supervision::accept_task))
        .route("/supervision/tasks/:task_id/complete", post(supervision::complete_task))
        .route("/supervision/reports/:report_id", put(supervision::update_report))
        // workflows
        .route(
            "/workflow/templates",
            get(workflows::list_templates).post(workflows::create_template),
        )
        .route(
            "/workflow/templates/:template_id",
            get(workflows::get_template)
                .put(workflows::update_template)
                .delete(workflows::delete_template),
        )
        .route(
            "/workflow/instances",
            get(workflows::list_instances).post(workflows::create_instance),
        )
        .route("/workflow/instances/:instance_id", get(workflows::get_instance))
        .route("/workflow/instances/:instance_id/start", post(workflows::start_instance))
        .route("/workflow/instances/:instance_id/suspend", post(workflows::suspend_instance))
        .route("/workflow/instances/:instance_id/resume", post(workflows::resume_instance))
        .route(
            "/workflow/instances/:instance_id/terminate",
            post(workflows::terminate_instance),
        )
        .route("/workflow/instances/:instance_id/nodes", get(workflows::instance_nodes))
        .route(
            "/workflow/instances/:instance_id/transitions",
            get(workflows::instance_transitions),
        )
        .route("/workflow/my-tasks", get(workflows::my_tasks))
        .route("/workflow/tasks/:node_id/complete", post(workflows::complete_task))
        .route("/workflow/stats", get(workflows::workflow_stats))
        // monitoring
        .route("/monitoring/stats", get(monitoring::stats))
        .route("/monitoring/alerts", get(monitoring::list_alerts))
        .route("/monitoring/alerts/:alert_id/resolve", put(monitoring::resolve_alert))
        .route("/monitoring/scan", post(monitoring::scan))
        .route("/monitoring/status/update-overdue", post(monitoring::update_overdue_status))
        .route(
            "/monitoring/risk-analysis/department/:dept_id",
            get(monitoring::department_risk),
        )
        .route("/monitoring/dashboard", get(monitoring::dashboard))
        // notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/stats", get(notifications::notification_stats))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/send-bulk", post(notifications::send_bulk))
        .route("/notifications/retry-failed", post(notifications::retry_failed))
        .route("/notifications/cleanup-expired", post(notifications::cleanup_expired))
        .route("/notifications/:notification_id", delete(notifications::delete_notification))
        .route("/notifications/:notification_id/read", post(notifications::mark_read))
        .route("/notifications/:notification_id/confirm", post(notifications::confirm))
        // analytics
        .route("/analytics/overview", get(analytics::overview))
        .route("/analytics/export", get(analytics::export))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    // 登录与刷新不经过认证中间件
    let api = protected
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest(API_PREFIX, api)
        .layer(cors_layer(&state.config.server().cors_origins))
        .layer(from_fn(request_tracking_middleware::<axum::body::Body>))
        .with_state(state)
}
