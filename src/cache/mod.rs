pub mod redis;

pub use self::redis::{
    delete_cache, get_cache, is_token_revoked, redis_health_check, revoke_token, set_cache,
};

/// 监控统计缓存键
pub const MONITORING_STATS_KEY: &str = "monitoring:stats";
