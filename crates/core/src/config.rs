use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub proxy: ProxyPoolConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub default_ttl: u64,
    pub session_ttl: u64,
}

/// Mirrors `internal/scheduler.Config`'s defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub max_workers_per_queue: usize,
    pub worker_idle_timeout_secs: u64,
    pub auto_scale_interval_secs: u64,
    pub max_queue_depth: usize,
    pub base_retry_delay_secs: u64,
    pub default_qps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolConfig {
    pub min_dynamic: usize,
    pub min_static: usize,
    pub dynamic_enabled: bool,
    pub static_enabled: bool,
    /// How long a leased proxy's live-check is allowed to take. Mirrors
    /// the original's named `ProxyTimeout` constant (10s).
    pub proxy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub allow_none_account: bool,
    pub default_expiry_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::AppError> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|e| crate::AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?,
                cors_origins: env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite::memory:".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                idle_timeout: env::var("DATABASE_IDLE_TIMEOUT")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            },
            cache: CacheConfig {
                redis_url: env::var("APP_REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                max_connections: env::var("REDIS_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
                connection_timeout: env::var("REDIS_CONNECTION_TIMEOUT")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                default_ttl: env::var("CACHE_TTL_DEFAULT")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                session_ttl: env::var("CACHE_TTL_SESSION")
                    .unwrap_or_else(|_| "604800".to_string())
                    .parse()
                    .unwrap_or(604800),
            },
            scheduler: SchedulerConfig {
                max_workers_per_queue: env::var("SCHEDULER_MAX_WORKERS_PER_QUEUE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
                worker_idle_timeout_secs: env::var("SCHEDULER_WORKER_IDLE_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                auto_scale_interval_secs: env::var("SCHEDULER_AUTOSCALE_INTERVAL")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                max_queue_depth: env::var("SCHEDULER_MAX_QUEUE_DEPTH")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
                base_retry_delay_secs: env::var("SCHEDULER_BASE_RETRY_DELAY")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                default_qps: env::var("SCHEDULER_DEFAULT_QPS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
            },
            proxy: ProxyPoolConfig {
                min_dynamic: env::var("PROXY_MIN_DYNAMIC")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                min_static: env::var("PROXY_MIN_STATIC")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                dynamic_enabled: env::var("PROXY_DYNAMIC_ENABLED")
                    .map(|v| v != "false")
                    .unwrap_or(true),
                static_enabled: env::var("PROXY_STATIC_ENABLED")
                    .map(|v| v != "false")
                    .unwrap_or(true),
                proxy_timeout_secs: env::var("PROXY_TIMEOUT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            session: SessionConfig {
                allow_none_account: env::var("SESSION_ALLOW_NONE_ACCOUNT")
                    .map(|v| v == "true")
                    .unwrap_or(false),
                default_expiry_secs: env::var("SESSION_DEFAULT_EXPIRY")
                    .unwrap_or_else(|_| "604800".to_string()) // 7 days
                    .parse()
                    .unwrap_or(604_800),
            },
        })
    }
}
