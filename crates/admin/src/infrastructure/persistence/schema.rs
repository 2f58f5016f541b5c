//! 内嵌数据库结构迁移

use idconf_adapter_postgres::{Migration, MigrationManager};
use idconf_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::info;

/// 配置库的全部迁移（按版本排序）
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "configuration_store",
            include_str!("../../../migrations/0001_configuration_store.up.sql"),
        )
        .with_down(include_str!(
            "../../../migrations/0001_configuration_store.down.sql"
        )),
        Migration::new(
            2,
            "roles",
            include_str!("../../../migrations/0002_roles.up.sql"),
        )
        .with_down(include_str!("../../../migrations/0002_roles.down.sql")),
    ]
}

/// 应用全部待处理迁移
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let result = MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await?;

    if !result.is_success() {
        let detail: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{} ({}): {}", e.version, e.name, e.error))
            .collect();
        return Err(AppError::database(format!(
            "Schema migration failed: {}",
            detail.join("; ")
        )));
    }

    info!(
        applied = result.applied_count(),
        skipped = result.skipped.len(),
        "Schema migrations up to date"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_unique_and_ordered() {
        let migrations = migrations();
        assert!(!migrations.is_empty());

        for pair in migrations.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn test_every_migration_reversible() {
        for migration in migrations() {
            assert!(migration.down_sql.is_some(), "{} has no down SQL", migration.name);
            assert!(!migration.checksum.is_empty());
        }
    }
}
