//! PostgreSQL 健康检查模块
//!
//! 提供连接池级别的健康检查

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use idconf_telemetry::HealthStatus;
use sqlx::PgPool;
use tracing::{debug, error};

/// 连接池健康状态
#[derive(Debug, Clone)]
pub struct PoolHealthStatus {
    pub size: u32,
    pub idle: u32,
    pub active: u32,
}

/// 健康检查器
pub struct HealthChecker {
    pool: PgPool,
    healthy: Arc<AtomicBool>,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            healthy: Arc::new(AtomicBool::new(true)),
            timeout: Duration::from_secs(5),
        }
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 检查是否健康（最近一次检查的结果）
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// 获取连接池状态
    pub fn pool_status(&self) -> PoolHealthStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        PoolHealthStatus {
            size,
            idle,
            active: size.saturating_sub(idle),
        }
    }

    /// 执行健康检查并追加到聚合状态
    pub async fn check_into(&self, status: &mut HealthStatus) {
        let start = std::time::Instant::now();

        let result = tokio::time::timeout(
            self.timeout,
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                let latency = start.elapsed().as_millis() as u64;
                self.healthy.store(true, Ordering::SeqCst);
                debug!(latency_ms = latency, "PostgreSQL health check ok");
                status.add_check_with_latency("postgres", true, None, Some(latency));
            }
            Ok(Err(e)) => {
                self.healthy.store(false, Ordering::SeqCst);
                error!(error = %e, "PostgreSQL health check failed");
                status.add_check("postgres", false, Some(e.to_string()));
            }
            Err(_) => {
                self.healthy.store(false, Ordering::SeqCst);
                error!(timeout_ms = self.timeout.as_millis() as u64, "PostgreSQL health check timed out");
                status.add_check("postgres", false, Some("health check timed out".to_string()));
            }
        }
    }
}
