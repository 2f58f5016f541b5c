//! PostgreSQL API 密钥仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idconf_common::{PagedResult, Pagination};
use idconf_config::AdminConfig;
use idconf_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::api_resource_repository::queries as resource_queries;
use super::error_mapper::map_sqlx_error;
use crate::domain::api_resource::{
    ApiResourceId, ApiSecret, ApiSecretId, ApiSecretRepository, ApiSecretType,
};

pub struct PostgresApiSecretRepository {
    pool: PgPool,
    paging: AdminConfig,
}

impl PostgresApiSecretRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, AdminConfig::default())
    }

    pub fn with_config(pool: PgPool, paging: AdminConfig) -> Self {
        Self { pool, paging }
    }
}

#[async_trait]
impl ApiSecretRepository for PostgresApiSecretRepository {
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiSecret>> {
        let pagination = pagination
            .clone()
            .clamped(self.paging.default_page_size, self.paging.max_page_size);

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let total = queries::count_by_resource(&mut conn, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let secrets = queries::fetch_secrets_page(
            &mut conn,
            resource_id.0,
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(secrets, total as u64, &pagination))
    }

    async fn find_by_id(&self, id: &ApiSecretId) -> AppResult<Option<ApiSecret>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_secret(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn add(&self, secret: &ApiSecret) -> AppResult<()> {
        debug!(resource_id = %secret.api_resource_id, "Adding API secret");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        if !resource_queries::resource_exists(&mut conn, secret.api_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                secret.api_resource_id
            )));
        }

        queries::insert_secret(&mut conn, secret)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&self, id: &ApiSecretId) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let rows = queries::delete_secret(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found("API secret not found"));
        }

        Ok(())
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
pub(crate) struct ApiSecretRow {
    pub(crate) id: Uuid,
    pub(crate) api_resource_id: Uuid,
    pub(crate) description: Option<String>,
    pub(crate) value: String,
    pub(crate) secret_type: String,
    pub(crate) expiration: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
}

impl ApiSecretRow {
    /// 未知的密钥类型按共享密钥处理，保持旧行可读
    pub(crate) fn into_secret(self) -> ApiSecret {
        ApiSecret {
            id: ApiSecretId::from_uuid(self.id),
            api_resource_id: ApiResourceId::from_uuid(self.api_resource_id),
            description: self.description,
            value: self.value,
            secret_type: ApiSecretType::parse(&self.secret_type)
                .unwrap_or(ApiSecretType::SharedSecret),
            expiration: self.expiration,
            created_at: self.created_at,
        }
    }
}

// ============ 查询助手（池实现与事务实现共用） ============

pub(crate) mod queries {
    use sqlx::PgConnection;
    use uuid::Uuid;

    use super::ApiSecretRow;
    use crate::domain::api_resource::ApiSecret;

    const SELECT_SECRET: &str = r#"
        SELECT id, api_resource_id, description, value, secret_type, expiration, created_at
        FROM api_secrets
    "#;

    pub(crate) async fn count_by_resource(
        conn: &mut PgConnection,
        resource_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM api_secrets WHERE api_resource_id = $1")
                .bind(resource_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(row.0)
    }

    pub(crate) async fn fetch_secrets_page(
        conn: &mut PgConnection,
        resource_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ApiSecret>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ApiSecretRow>(&format!(
            "{} WHERE api_resource_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            SELECT_SECRET
        ))
        .bind(resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_secret()).collect())
    }

    pub(crate) async fn fetch_secret(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ApiSecret>, sqlx::Error> {
        let row = sqlx::query_as::<_, ApiSecretRow>(&format!("{} WHERE id = $1", SELECT_SECRET))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(|r| r.into_secret()))
    }

    pub(crate) async fn insert_secret(
        conn: &mut PgConnection,
        secret: &ApiSecret,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO api_secrets (id, api_resource_id, description, value,
                                     secret_type, expiration, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(secret.id.0)
        .bind(secret.api_resource_id.0)
        .bind(&secret.description)
        .bind(&secret.value)
        .bind(secret.secret_type.as_str())
        .bind(secret.expiration)
        .bind(secret.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn delete_secret(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_secrets WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}
