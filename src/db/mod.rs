pub mod enums;
pub mod models;
pub mod repositories;

use std::time::Duration;

use diesel::PgConnection;
use diesel::r2d2::{self, ConnectionManager as DbConnectionManager};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

pub type DbPool = r2d2::Pool<DbConnectionManager<PgConnection>>;

pub fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let manager = DbConnectionManager::<PgConnection>::new(&config.url);
    r2d2::Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(manager)
        .map_err(|e| AppError::Config(format!("Failed to create database pool: {}", e)))
}

/// 在阻塞线程池中取连接并执行同步的 diesel 操作
pub async fn run<T, F>(pool: &DbPool, f: F) -> AppResult<T>
where
    F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await
    .map_err(|e| AppError::internal(format!("Blocking task failed: {}", e)))?
}
