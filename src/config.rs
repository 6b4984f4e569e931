use crate::error::{AppError, AppResult};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub database_min_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub database_connection_timeout: u64,

    pub redis_url: String,

    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_expires")]
    pub jwt_access_token_expires_in: u64,
    #[serde(default = "default_refresh_token_expires")]
    pub jwt_refresh_token_expires_in: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_monitor_upcoming_days")]
    pub monitor_upcoming_days: i64,
    #[serde(default = "default_monitor_urgent_idle_hours")]
    pub monitor_urgent_idle_hours: i64,
    #[serde(default = "default_monitor_workload_threshold")]
    pub monitor_workload_threshold: i64,
    #[serde(default = "default_monitor_stats_ttl")]
    pub monitor_stats_cache_ttl: u64,
}

// 嵌套结构的访问器
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expires_in: u64,
    pub refresh_token_expires_in: u64,
    pub bcrypt_cost: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Clone, Debug)]
pub struct MonitoringConfig {
    pub interval_secs: u64,
    pub upcoming_days: i64,
    pub urgent_idle_hours: i64,
    pub workload_threshold: i64,
    pub stats_cache_ttl: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
            upcoming_days: default_monitor_upcoming_days(),
            urgent_idle_hours: default_monitor_urgent_idle_hours(),
            workload_threshold: default_monitor_workload_threshold(),
            stats_cache_ttl: default_monitor_stats_ttl(),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connection_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_jwt_secret() -> String {
    "your-secret-key".to_string()
}
fn default_access_token_expires() -> u64 {
    1800
} // 30 minutes
fn default_refresh_token_expires() -> u64 {
    604800
} // 7 days
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_bcrypt_cost() -> u32 {
    10
}
fn default_monitor_interval() -> u64 {
    300
}
fn default_monitor_upcoming_days() -> i64 {
    3
}
fn default_monitor_urgent_idle_hours() -> i64 {
    24
}
fn default_monitor_workload_threshold() -> i64 {
    10
}
fn default_monitor_stats_ttl() -> u64 {
    60
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Builds a config from explicit key/value pairs (upper-case env names).
    pub fn from_pairs<I, K, V>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config = envy::from_iter::<_, Config>(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())),
        )
        .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.database_min_connections > self.database_max_connections {
            return Err(AppError::Config(
                "DATABASE_MIN_CONNECTIONS cannot be greater than DATABASE_MAX_CONNECTIONS"
                    .to_string(),
            ));
        }

        if self.jwt_secret == "your-secret-key" || self.jwt_secret.len() < 16 {
            return Err(AppError::Config(
                "JWT_SECRET must be set to a secure value".to_string(),
            ));
        }

        if self.jwt_access_token_expires_in == 0 {
            return Err(AppError::Config(
                "JWT_ACCESS_TOKEN_EXPIRES_IN must be > 0".to_string(),
            ));
        }

        if self.jwt_refresh_token_expires_in <= self.jwt_access_token_expires_in {
            return Err(AppError::Config(
                "JWT_REFRESH_TOKEN_EXPIRES_IN must exceed the access token lifetime".to_string(),
            ));
        }

        if self.monitor_interval_secs == 0 {
            return Err(AppError::Config(
                "MONITOR_INTERVAL_SECS must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connection_timeout: self.database_connection_timeout,
        }
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            access_token_expires_in: self.jwt_access_token_expires_in,
            refresh_token_expires_in: self.jwt_refresh_token_expires_in,
            bcrypt_cost: self.bcrypt_cost,
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }

    pub fn monitoring(&self) -> MonitoringConfig {
        MonitoringConfig {
            interval_secs: self.monitor_interval_secs,
            upcoming_days: self.monitor_upcoming_days,
            urgent_idle_hours: self.monitor_urgent_idle_hours,
            workload_threshold: self.monitor_workload_threshold,
            stats_cache_ttl: self.monitor_stats_cache_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/supervision"),
            ("REDIS_URL", "redis://127.0.0.1/"),
            ("JWT_SECRET", "a-long-enough-test-secret"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_pairs(base()).unwrap();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.log_format, "json");
        let monitoring = config.monitoring();
        assert_eq!(monitoring.interval_secs, 300);
        assert_eq!(monitoring.upcoming_days, 3);
        assert_eq!(monitoring.workload_threshold, 10);
        assert_eq!(config.server_address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = base();
        pairs.push(("SERVER_PORT", "9100"));
        pairs.push(("MONITOR_UPCOMING_DAYS", "5"));
        let config = Config::from_pairs(pairs).unwrap();
        assert_eq!(config.server_port, 9100);
        assert_eq!(config.monitoring().upcoming_days, 5);
    }

    #[test]
    fn test_rejects_default_secret() {
        let pairs = vec![
            ("DATABASE_URL", "postgres://localhost/supervision"),
            ("REDIS_URL", "redis://127.0.0.1/"),
        ];
        assert!(matches!(Config::from_pairs(pairs), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_short_refresh_lifetime() {
        let mut pairs = base();
        pairs.push(("JWT_ACCESS_TOKEN_EXPIRES_IN", "3600"));
        pairs.push(("JWT_REFRESH_TOKEN_EXPIRES_IN", "60"));
        assert!(Config::from_pairs(pairs).is_err());
    }

    #[test]
    fn test_missing_database_url() {
        let pairs = vec![("REDIS_URL", "redis://127.0.0.1/")];
        assert!(Config::from_pairs(pairs).is_err());
    }
}
