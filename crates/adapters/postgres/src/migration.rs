//! PostgreSQL 迁移管理模块

use idconf_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::{info, warn};

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub down_sql: Option<String>,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::calculate_checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            down_sql: None,
            checksum,
        }
    }

    pub fn with_down(mut self, down_sql: impl Into<String>) -> Self {
        self.down_sql = Some(down_sql.into());
        self
    }

    fn calculate_checksum(sql: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        sql.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    /// 设置迁移表名
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        info!(table = %self.table_name, "Migration table initialized");
        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn get_applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        let records = sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))?;

        Ok(records)
    }

    /// 获取当前版本
    pub async fn current_version(&self) -> AppResult<Option<i64>> {
        let sql = format!("SELECT MAX(version) FROM {}", self.table_name);

        let row: Option<(Option<i64>,)> = sqlx::query_as(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get current version: {}", e)))?;

        Ok(row.and_then(|(v,)| v))
    }

    /// 应用单个迁移
    pub async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        // 检查是否已应用
        let check_sql = format!(
            "SELECT version FROM {} WHERE version = $1",
            self.table_name
        );
        let existing: Option<(i64,)> = sqlx::query_as(&check_sql)
            .bind(migration.version)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to check migration: {}", e)))?;

        if existing.is_some() {
            warn!(
                version = migration.version,
                name = %migration.name,
                "Migration already applied, skipping"
            );
            return Ok(());
        }

        sqlx::query(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
            self.table_name
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(&migration.name)
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration applied successfully"
        );

        Ok(())
    }

    /// 回滚单个迁移
    pub async fn rollback(&self, migration: &Migration) -> AppResult<()> {
        let down_sql = migration.down_sql.as_ref().ok_or_else(|| {
            AppError::internal(format!(
                "Migration {} does not have down SQL",
                migration.version
            ))
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(down_sql).execute(&mut *tx).await.map_err(|e| {
            AppError::database(format!(
                "Failed to rollback migration {}: {}",
                migration.version, e
            ))
        })?;

        let delete_sql = format!("DELETE FROM {} WHERE version = $1", self.table_name);
        sqlx::query(&delete_sql)
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete migration record: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit rollback: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration rolled back successfully"
        );

        Ok(())
    }

    /// 应用所有待处理的迁移
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let applied = self.get_applied_migrations().await?;
        let applied_versions: std::collections::HashSet<i64> =
            applied.iter().map(|m| m.version).collect();

        let mut result = MigrationResult {
            applied: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        };

        let mut sorted_migrations: Vec<_> = migrations.iter().collect();
        sorted_migrations.sort_by_key(|m| m.version);

        for migration in sorted_migrations {
            if applied_versions.contains(&migration.version) {
                // 验证校验和
                if let Some(record) = applied.iter().find(|r| r.version == migration.version) {
                    if record.checksum != migration.checksum {
                        result.errors.push(MigrationError {
                            version: migration.version,
                            name: migration.name.clone(),
                            error: "Checksum mismatch - migration has been modified".to_string(),
                        });
                        continue;
                    }
                }
                result.skipped.push(migration.version);
                continue;
            }

            match self.apply(migration).await {
                Ok(()) => {
                    result.applied.push(migration.version);
                }
                Err(e) => {
                    result.errors.push(MigrationError {
                        version: migration.version,
                        name: migration.name.clone(),
                        error: e.to_string(),
                    });
                    // 停止后续迁移
                    break;
                }
            }
        }

        Ok(result)
    }
}

/// 迁移结果
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
    pub errors: Vec<MigrationError>,
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// 迁移错误
#[derive(Debug, Clone)]
pub struct MigrationError {
    pub version: i64,
    pub name: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration =
            Migration::new(1, "create_resources", "CREATE TABLE api_resources (id UUID PRIMARY KEY)")
                .with_down("DROP TABLE api_resources");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.name, "create_resources");
        assert!(migration.down_sql.is_some());
        assert!(!migration.checksum.is_empty());
    }

    #[test]
    fn test_checksum_consistency() {
        let sql = "CREATE TABLE test (id INT)";
        let m1 = Migration::new(1, "test", sql);
        let m2 = Migration::new(1, "test", sql);

        assert_eq!(m1.checksum, m2.checksum);
    }

    #[test]
    fn test_checksum_difference() {
        let m1 = Migration::new(1, "test", "CREATE TABLE test1 (id INT)");
        let m2 = Migration::new(1, "test", "CREATE TABLE test2 (id INT)");

        assert_ne!(m1.checksum, m2.checksum);
    }

    #[test]
    fn test_migration_result() {
        let result = MigrationResult {
            applied: vec![1, 2],
            skipped: vec![],
            errors: vec![],
        };

        assert!(result.is_success());
        assert_eq!(result.applied_count(), 2);
    }
}
