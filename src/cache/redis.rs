use ::redis::{AsyncCommands, Client, cmd};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::AppError;

const REVOKED_TOKEN_PREFIX: &str = "revoked_token:";

async fn connection(
    redis_client: &Client,
) -> Result<::redis::aio::MultiplexedConnection, AppError> {
    redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
}

/// 读取 JSON 缓存，任何失败都视为未命中
pub async fn get_cache<T: DeserializeOwned>(client: &Client, key: &str) -> Option<T> {
    let mut conn = client.get_multiplexed_async_connection().await.ok()?;
    let value: Option<String> = conn.get(key).await.ok()?;
    serde_json::from_str(&value?).ok()
}

pub async fn set_cache<T: Serialize>(
    client: &Client,
    key: &str,
    value: &T,
    ttl: u64,
) -> Result<(), AppError> {
    let mut conn = connection(client).await?;
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize cache value: {}", e)))?;
    let _: () = conn
        .set_ex(key, json, ttl)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write cache: {}", e)))?;
    Ok(())
}

pub async fn delete_cache(client: &Client, key: &str) -> Result<(), AppError> {
    let mut conn = connection(client).await?;
    let _: i32 = conn
        .del(key)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to delete cache key {}: {}", key, e)))?;
    Ok(())
}

/// 注销后的令牌加入黑名单，保留到令牌自然过期
pub async fn revoke_token(redis_client: &Client, jti: &str, ttl: u64) -> Result<(), AppError> {
    if ttl == 0 {
        return Ok(());
    }
    let mut conn = connection(redis_client).await?;
    let key = format!("{}{}", REVOKED_TOKEN_PREFIX, jti);
    let _: () = conn
        .set_ex(&key, 1, ttl)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to revoke token: {}", e)))?;
    Ok(())
}

pub async fn is_token_revoked(redis_client: &Client, jti: &str) -> Result<bool, AppError> {
    let mut conn = connection(redis_client).await?;
    let key = format!("{}{}", REVOKED_TOKEN_PREFIX, jti);
    let exists: bool = conn
        .exists(&key)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to check token revocation: {}", e)))?;
    Ok(exists)
}

/// Redis健康检查
pub async fn redis_health_check(redis_client: &Client) -> Result<bool, AppError> {
    let mut conn = connection(redis_client).await?;

    let pong: String = cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| AppError::Internal(format!("Redis health check failed: {}", e)))?;

    Ok(pong == "PONG")
}
