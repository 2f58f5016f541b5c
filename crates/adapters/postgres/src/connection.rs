//! PostgreSQL 连接管理

use std::time::Duration;

use idconf_config::DatabaseConfig;
use idconf_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// PostgreSQL 连接池配置
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl From<&DatabaseConfig> for PostgresConfig {
    // 秘密值只在此处展开一次
    fn from(config: &DatabaseConfig) -> Self {
        Self::new(config.url.expose_secret()).with_max_connections(config.max_connections)
    }
}

/// 创建 PostgreSQL 连接池
pub async fn create_pool(config: &PostgresConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))
}

/// 从应用配置创建连接池
pub async fn pool_from_config(config: &DatabaseConfig) -> AppResult<PgPool> {
    create_pool(&PostgresConfig::from(config)).await
}

/// 检查数据库连接
pub async fn check_connection(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Database health check failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = PostgresConfig::new("postgres://localhost/idconf");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);

        let config = config.with_max_connections(42);
        assert_eq!(config.max_connections, 42);
    }
}
