//! PostgreSQL 角色视图仓储实现（只读）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idconf_common::{PagedResult, Pagination, UserId};
use idconf_config::AdminConfig;
use idconf_domain_core::{TreeAssembly, assemble};
use idconf_errors::AppResult;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use super::like_pattern;
use crate::domain::role_view::{RoleId, RoleView, RoleViewRepository};

const SELECT_ROLE: &str = r#"
    SELECT id, parent_id, name, normalized_name, concurrency_stamp, description,
           created_at, created_by, updated_at, updated_by
    FROM roles
"#;

pub struct PostgresRoleViewRepository {
    pool: PgPool,
    paging: AdminConfig,
}

impl PostgresRoleViewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, AdminConfig::default())
    }

    pub fn with_config(pool: PgPool, paging: AdminConfig) -> Self {
        Self { pool, paging }
    }
}

#[async_trait]
impl RoleViewRepository for PostgresRoleViewRepository {
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RoleView>> {
        let pagination = pagination
            .clone()
            .clamped(self.paging.default_page_size, self.paging.max_page_size);
        let pattern = search.map(like_pattern);

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM roles WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR normalized_name ILIKE $1)",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows = sqlx::query_as::<_, RoleViewRow>(&format!(
            "{} WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR normalized_name ILIKE $1) ORDER BY name ASC LIMIT $2 OFFSET $3",
            SELECT_ROLE
        ))
        .bind(pattern.as_deref())
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let views = rows.into_iter().map(Into::into).collect();
        Ok(PagedResult::new(views, total.0 as u64, &pagination))
    }

    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<RoleView>> {
        debug!(id = %id, "Finding role view");

        let row = sqlx::query_as::<_, RoleViewRow>(&format!("{} WHERE id = $1", SELECT_ROLE))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn children_of(&self, id: &RoleId) -> AppResult<Vec<RoleView>> {
        let rows = sqlx::query_as::<_, RoleViewRow>(&format!(
            "{} WHERE parent_id = $1 ORDER BY name ASC",
            SELECT_ROLE
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn load_tree(&self) -> AppResult<TreeAssembly<RoleView>> {
        let timer = QueryTimer::new("roles", "load_tree");
        let rows = sqlx::query_as::<_, RoleViewRow>(&format!("{} ORDER BY name ASC", SELECT_ROLE))
            .fetch_all(&self.pool)
            .await;
        match &rows {
            Ok(_) => timer.finish(),
            Err(_) => timer.finish_with_error(),
        }

        let views: Vec<RoleView> = rows
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Into::into)
            .collect();
        let assembly = assemble(views);

        if !assembly.is_complete() {
            warn!(
                detached = assembly.detached.len(),
                "Role tree contains rows unreachable from any root"
            );
        }

        Ok(assembly)
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
struct RoleViewRow {
    id: Uuid,
    parent_id: Option<Uuid>,
    name: String,
    normalized_name: String,
    concurrency_stamp: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
}

impl From<RoleViewRow> for RoleView {
    fn from(row: RoleViewRow) -> Self {
        RoleView {
            id: RoleId::from_uuid(row.id),
            parent_id: row.parent_id.map(RoleId::from_uuid),
            name: row.name,
            normalized_name: row.normalized_name,
            concurrency_stamp: row.concurrency_stamp,
            description: row.description,
            audit_info: idconf_common::AuditInfo {
                created_at: row.created_at,
                created_by: row.created_by.map(UserId::from_uuid),
                updated_at: row.updated_at,
                updated_by: row.updated_by.map(UserId::from_uuid),
            },
        }
    }
}
