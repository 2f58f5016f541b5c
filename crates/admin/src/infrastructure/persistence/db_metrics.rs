//! 数据库查询监控

use std::time::Instant;

use metrics::{counter, histogram};

/// 数据库监控工具
pub struct DbMetrics;

impl DbMetrics {
    /// 记录查询（计时）
    pub fn record_query(start: Instant, table: &str, operation: &str) {
        histogram!(
            "db_query_duration_ms",
            "table" => table.to_string(),
            "operation" => operation.to_string()
        )
        .record(start.elapsed().as_millis() as f64);

        counter!(
            "db_queries_total",
            "table" => table.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    /// 记录查询错误
    pub fn record_error(table: &str, operation: &str) {
        counter!(
            "db_query_errors_total",
            "table" => table.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }
}

/// 用于计时的守卫结构
pub struct QueryTimer {
    start: Instant,
    table: String,
    operation: String,
}

impl QueryTimer {
    pub fn new(table: &str, operation: &str) -> Self {
        Self {
            start: Instant::now(),
            table: table.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn finish(self) {
        let duration_ms = self.start.elapsed().as_millis();
        DbMetrics::record_query(self.start, &self.table, &self.operation);

        // 慢查询日志 (阈值: 100ms)
        if duration_ms > 100 {
            tracing::warn!(
                table = %self.table,
                operation = %self.operation,
                duration_ms = %duration_ms,
                "Slow query detected"
            );
            counter!(
                "db_slow_queries_total",
                "table" => self.table.clone(),
                "operation" => self.operation.clone()
            )
            .increment(1);
        }
    }

    pub fn finish_with_error(self) {
        DbMetrics::record_query(self.start, &self.table, &self.operation);
        DbMetrics::record_error(&self.table, &self.operation);
    }
}
