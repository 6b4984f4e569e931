pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod monitoring;
pub mod routes;
pub mod schema;
pub mod services;
pub mod validation;
pub mod workflow;

use crate::config::Config;
use crate::db::DbPool;
use crate::middleware::auth::TokenService;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub redis: redis::Client,
    pub config: Arc<Config>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: DbPool, redis: redis::Client, config: Config) -> Self {
        let tokens = TokenService::new(&config.auth());
        Self {
            db,
            redis,
            config: Arc::new(config),
            tokens,
        }
    }
}

/// RUST_LOG 优先，其次使用配置中的日志级别
pub fn init_tracing(config: &Config) {
    let logging = config.logging();
    let level = match logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => logging.level.clone(),
        _ => "info".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
