//! PostgreSQL API 作用域仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idconf_common::{PagedResult, Pagination, UserId};
use idconf_config::AdminConfig;
use idconf_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::api_resource_repository::queries as resource_queries;
use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use crate::domain::api_resource::{ApiResourceId, ApiScope, ApiScopeId, ApiScopeRepository};

pub struct PostgresApiScopeRepository {
    pool: PgPool,
    paging: AdminConfig,
}

impl PostgresApiScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, AdminConfig::default())
    }

    pub fn with_config(pool: PgPool, paging: AdminConfig) -> Self {
        Self { pool, paging }
    }
}

#[async_trait]
impl ApiScopeRepository for PostgresApiScopeRepository {
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiScope>> {
        let pagination = pagination
            .clone()
            .clamped(self.paging.default_page_size, self.paging.max_page_size);

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let total = queries::count_by_resource(&mut conn, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;

        let timer = QueryTimer::new("api_scopes", "list_by_resource");
        let fetched = queries::fetch_scopes_with_claims(
            &mut conn,
            resource_id.0,
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await;
        match &fetched {
            Ok(_) => timer.finish(),
            Err(_) => timer.finish_with_error(),
        }

        Ok(PagedResult::new(
            fetched.map_err(map_sqlx_error)?,
            total as u64,
            &pagination,
        ))
    }

    async fn find_by_id(
        &self,
        resource_id: &ApiResourceId,
        scope_id: &ApiScopeId,
    ) -> AppResult<Option<ApiScope>> {
        debug!(resource_id = %resource_id, scope_id = %scope_id, "Finding API scope");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_scope_with_claims(&mut conn, resource_id.0, scope_id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, scope: &ApiScope) -> AppResult<()> {
        debug!(id = %scope.id, name = %scope.name, "Creating API scope");

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        if !resource_queries::resource_exists(&mut tx, scope.api_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                scope.api_resource_id
            )));
        }

        queries::insert_scope(&mut tx, scope)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, scope: &ApiScope) -> AppResult<()> {
        debug!(id = %scope.id, "Updating API scope");

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let rows = queries::update_scope(&mut tx, scope)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!("API scope {} not found", scope.id)));
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &ApiScopeId) -> AppResult<()> {
        debug!(id = %id, "Deleting API scope");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let rows = queries::delete_scope(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!("API scope {} not found", id)));
        }

        Ok(())
    }

    async fn name_available(&self, name: &str, exclude: Option<&ApiScopeId>) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::scope_name_available(&mut conn, name, exclude.map(|id| id.0))
            .await
            .map_err(map_sqlx_error)
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
pub(crate) struct ApiScopeRow {
    pub(crate) id: Uuid,
    pub(crate) api_resource_id: Uuid,
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) required: bool,
    pub(crate) emphasize: bool,
    pub(crate) show_in_discovery: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) created_by: Option<Uuid>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) updated_by: Option<Uuid>,
}

impl ApiScopeRow {
    pub(crate) fn into_scope(self, user_claims: Vec<String>) -> ApiScope {
        ApiScope {
            id: ApiScopeId::from_uuid(self.id),
            api_resource_id: ApiResourceId::from_uuid(self.api_resource_id),
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            required: self.required,
            emphasize: self.emphasize,
            show_in_discovery: self.show_in_discovery,
            user_claims,
            audit_info: idconf_common::AuditInfo {
                created_at: self.created_at,
                created_by: self.created_by.map(UserId::from_uuid),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(UserId::from_uuid),
            },
        }
    }
}

// ============ 查询助手（池实现与事务实现共用） ============

pub(crate) mod queries {
    use std::collections::HashMap;

    use sqlx::PgConnection;
    use uuid::Uuid;

    use super::ApiScopeRow;
    use crate::domain::api_resource::ApiScope;

    const SELECT_SCOPE: &str = r#"
        SELECT id, api_resource_id, name, display_name, description,
               required, emphasize, show_in_discovery,
               created_at, created_by, updated_at, updated_by
        FROM api_scopes
    "#;

    pub(crate) async fn count_by_resource(
        conn: &mut PgConnection,
        resource_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM api_scopes WHERE api_resource_id = $1")
                .bind(resource_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(row.0)
    }

    pub(crate) async fn fetch_scopes_with_claims(
        conn: &mut PgConnection,
        resource_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ApiScope>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ApiScopeRow>(&format!(
            "{} WHERE api_resource_id = $1 ORDER BY name DESC LIMIT $2 OFFSET $3",
            SELECT_SCOPE
        ))
        .bind(resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let claim_rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT api_scope_id, claim_type
            FROM api_scope_claims
            WHERE api_scope_id = ANY($1)
            ORDER BY claim_type
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut claims_map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (scope_id, claim_type) in claim_rows {
            claims_map.entry(scope_id).or_default().push(claim_type);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let claims = claims_map.remove(&row.id).unwrap_or_default();
                row.into_scope(claims)
            })
            .collect())
    }

    pub(crate) async fn fetch_scope_with_claims(
        conn: &mut PgConnection,
        resource_id: Uuid,
        scope_id: Uuid,
    ) -> Result<Option<ApiScope>, sqlx::Error> {
        let row = sqlx::query_as::<_, ApiScopeRow>(&format!(
            "{} WHERE id = $1 AND api_resource_id = $2",
            SELECT_SCOPE
        ))
        .bind(scope_id)
        .bind(resource_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let claims = fetch_claims(conn, scope_id).await?;
                Ok(Some(row.into_scope(claims)))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn fetch_claims(
        conn: &mut PgConnection,
        scope_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT claim_type FROM api_scope_claims WHERE api_scope_id = $1 ORDER BY claim_type",
        )
        .bind(scope_id)
        .fetch_all(&mut *conn)
        .await
    }

    pub(crate) async fn scope_name_available(
        conn: &mut PgConnection,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT NOT EXISTS(
                SELECT 1 FROM api_scopes
                WHERE name = $1 AND ($2::UUID IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    pub(crate) async fn insert_scope(
        conn: &mut PgConnection,
        scope: &ApiScope,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO api_scopes (id, api_resource_id, name, display_name, description,
                                    required, emphasize, show_in_discovery,
                                    created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(scope.id.0)
        .bind(scope.api_resource_id.0)
        .bind(&scope.name)
        .bind(&scope.display_name)
        .bind(&scope.description)
        .bind(scope.required)
        .bind(scope.emphasize)
        .bind(scope.show_in_discovery)
        .bind(scope.audit_info.created_at)
        .bind(scope.audit_info.created_by.as_ref().map(|u| u.0))
        .bind(scope.audit_info.updated_at)
        .bind(scope.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *conn)
        .await?;

        insert_claims(conn, scope.id.0, &scope.user_claims).await
    }

    /// 更新作用域行并整体替换声明，返回命中的行数
    pub(crate) async fn update_scope(
        conn: &mut PgConnection,
        scope: &ApiScope,
    ) -> Result<u64, sqlx::Error> {
        // 先清旧声明，再写新数据
        delete_claims(conn, scope.id.0).await?;

        let rows = sqlx::query(
            r#"
            UPDATE api_scopes
            SET name = $2, display_name = $3, description = $4,
                required = $5, emphasize = $6, show_in_discovery = $7,
                updated_at = $8, updated_by = $9
            WHERE id = $1
            "#,
        )
        .bind(scope.id.0)
        .bind(&scope.name)
        .bind(&scope.display_name)
        .bind(&scope.description)
        .bind(scope.required)
        .bind(scope.emphasize)
        .bind(scope.show_in_discovery)
        .bind(scope.audit_info.updated_at)
        .bind(scope.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if rows > 0 {
            insert_claims(conn, scope.id.0, &scope.user_claims).await?;
        }

        Ok(rows)
    }

    pub(crate) async fn delete_scope(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_scopes WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_claims(
        conn: &mut PgConnection,
        scope_id: Uuid,
        claims: &[String],
    ) -> Result<(), sqlx::Error> {
        if claims.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO api_scope_claims (api_scope_id, claim_type)
            SELECT $1, UNNEST($2::TEXT[])
            "#,
        )
        .bind(scope_id)
        .bind(claims)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn delete_claims(conn: &mut PgConnection, scope_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM api_scope_claims WHERE api_scope_id = $1")
            .bind(scope_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
