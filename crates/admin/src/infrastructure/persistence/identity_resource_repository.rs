//! PostgreSQL 身份资源仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idconf_common::{PagedResult, Pagination, UserId};
use idconf_config::AdminConfig;
use idconf_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use super::like_pattern;
use crate::domain::identity_resource::{
    IdentityResource, IdentityResourceId, IdentityResourceProperty, IdentityResourcePropertyId,
    IdentityResourceRepository,
};

pub struct PostgresIdentityResourceRepository {
    pool: PgPool,
    paging: AdminConfig,
}

impl PostgresIdentityResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, AdminConfig::default())
    }

    pub fn with_config(pool: PgPool, paging: AdminConfig) -> Self {
        Self { pool, paging }
    }
}

#[async_trait]
impl IdentityResourceRepository for PostgresIdentityResourceRepository {
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResource>> {
        let pagination = pagination
            .clone()
            .clamped(self.paging.default_page_size, self.paging.max_page_size);
        let pattern = search.map(like_pattern);

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let total = queries::count_resources(&mut conn, pattern.as_deref())
            .await
            .map_err(map_sqlx_error)?;

        let timer = QueryTimer::new("identity_resources", "list");
        let fetched = queries::fetch_resources_with_claims(
            &mut conn,
            pattern.as_deref(),
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

    async fn find_by_id(&self, id: &IdentityResourceId) -> AppResult<Option<IdentityResource>> {
        debug!(id = %id, "Finding identity resource");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_resource_with_claims(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<IdentityResource>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_resource_by_name_with_claims(&mut conn, name)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, resource: &IdentityResource) -> AppResult<()> {
        debug!(id = %resource.id, name = %resource.name, "Creating identity resource");

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        queries::insert_resource(&mut tx, resource)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, resource: &IdentityResource) -> AppResult<()> {
        debug!(id = %resource.id, "Updating identity resource");

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let rows = queries::update_resource(&mut tx, resource)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!(
                "Identity resource {} not found",
                resource.id
            )));
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &IdentityResourceId) -> AppResult<()> {
        debug!(id = %id, "Deleting identity resource");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let rows = queries::delete_resource(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!(
                "Identity resource {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn name_available(
        &self,
        name: &str,
        exclude: Option<&IdentityResourceId>,
    ) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::resource_name_available(&mut conn, name, exclude.map(|id| id.0))
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_properties(
        &self,
        resource_id: &IdentityResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResourceProperty>> {
        let pagination = pagination
            .clone()
            .clamped(self.paging.default_page_size, self.paging.max_page_size);

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let total = queries::count_properties(&mut conn, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let rows = queries::fetch_properties_page(
            &mut conn,
            resource_id.0,
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        let properties = rows.into_iter().map(Into::into).collect();
        Ok(PagedResult::new(properties, total as u64, &pagination))
    }

    async fn find_property(
        &self,
        id: &IdentityResourcePropertyId,
    ) -> AppResult<Option<IdentityResourceProperty>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let row = queries::fetch_property(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn add_property(&self, property: &IdentityResourceProperty) -> AppResult<()> {
        debug!(resource_id = %property.identity_resource_id, key = %property.key, "Adding identity resource property");

        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        if !queries::resource_exists(&mut conn, property.identity_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "Identity resource {} not found",
                property.identity_resource_id
            )));
        }

        queries::insert_property(&mut conn, property)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete_property(&self, id: &IdentityResourcePropertyId) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let rows = queries::delete_property(&mut conn, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found("Identity resource property not found"));
        }

        Ok(())
    }

    async fn property_key_available(
        &self,
        resource_id: &IdentityResourceId,
        key: &str,
    ) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::property_key_available(&mut conn, resource_id.0, key)
            .await
            .map_err(map_sqlx_error)
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
pub(crate) struct IdentityResourceRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) enabled: bool,
    pub(crate) required: bool,
    pub(crate) emphasize: bool,
    pub(crate) show_in_discovery: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) created_by: Option<Uuid>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) updated_by: Option<Uuid>,
}

impl IdentityResourceRow {
    pub(crate) fn into_resource(self, user_claims: Vec<String>) -> IdentityResource {
        IdentityResource {
            id: IdentityResourceId::from_uuid(self.id),
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            enabled: self.enabled,
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

#[derive(sqlx::FromRow)]
pub(crate) struct IdentityResourcePropertyRow {
    pub(crate) id: Uuid,
    pub(crate) identity_resource_id: Uuid,
    pub(crate) key: String,
    pub(crate) value: String,
}

impl From<IdentityResourcePropertyRow> for IdentityResourceProperty {
    fn from(row: IdentityResourcePropertyRow) -> Self {
        IdentityResourceProperty {
            id: IdentityResourcePropertyId::from_uuid(row.id),
            identity_resource_id: IdentityResourceId::from_uuid(row.identity_resource_id),
            key: row.key,
            value: row.value,
        }
    }
}

// ============ 查询助手（池实现与事务实现共用） ============

pub(crate) mod queries {
    use std::collections::HashMap;

    use sqlx::PgConnection;
    use uuid::Uuid;

    use super::{IdentityResourcePropertyRow, IdentityResourceRow};
    use crate::domain::identity_resource::{IdentityResource, IdentityResourceProperty};

    const SELECT_RESOURCE: &str = r#"
        SELECT id, name, display_name, description, enabled,
               required, emphasize, show_in_discovery,
               created_at, created_by, updated_at, updated_by
        FROM identity_resources
    "#;

    pub(crate) async fn count_resources(
        conn: &mut PgConnection,
        pattern: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM identity_resources WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(pattern)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    pub(crate) async fn fetch_resources_with_claims(
        conn: &mut PgConnection,
        pattern: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<IdentityResource>, sqlx::Error> {
        let rows = sqlx::query_as::<_, IdentityResourceRow>(&format!(
            "{} WHERE ($1::TEXT IS NULL OR name ILIKE $1) ORDER BY name DESC LIMIT $2 OFFSET $3",
            SELECT_RESOURCE
        ))
        .bind(pattern)
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
            SELECT identity_resource_id, claim_type
            FROM identity_resource_claims
            WHERE identity_resource_id = ANY($1)
            ORDER BY claim_type
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut claims_map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (resource_id, claim_type) in claim_rows {
            claims_map.entry(resource_id).or_default().push(claim_type);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let claims = claims_map.remove(&row.id).unwrap_or_default();
                row.into_resource(claims)
            })
            .collect())
    }

    pub(crate) async fn fetch_resource_with_claims(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<IdentityResource>, sqlx::Error> {
        let row =
            sqlx::query_as::<_, IdentityResourceRow>(&format!("{} WHERE id = $1", SELECT_RESOURCE))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        match row {
            Some(row) => {
                let claims = fetch_claims(conn, id).await?;
                Ok(Some(row.into_resource(claims)))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn fetch_resource_by_name_with_claims(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<IdentityResource>, sqlx::Error> {
        let row = sqlx::query_as::<_, IdentityResourceRow>(&format!(
            "{} WHERE name = $1",
            SELECT_RESOURCE
        ))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let claims = fetch_claims(conn, row.id).await?;
                Ok(Some(row.into_resource(claims)))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn fetch_claims(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT claim_type FROM identity_resource_claims WHERE identity_resource_id = $1 ORDER BY claim_type",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await
    }

    pub(crate) async fn resource_exists(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM identity_resources WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(row.0)
    }

    pub(crate) async fn resource_name_available(
        conn: &mut PgConnection,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT NOT EXISTS(
                SELECT 1 FROM identity_resources
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

    pub(crate) async fn insert_resource(
        conn: &mut PgConnection,
        resource: &IdentityResource,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO identity_resources (id, name, display_name, description, enabled,
                                            required, emphasize, show_in_discovery,
                                            created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(resource.id.0)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .bind(resource.enabled)
        .bind(resource.required)
        .bind(resource.emphasize)
        .bind(resource.show_in_discovery)
        .bind(resource.audit_info.created_at)
        .bind(resource.audit_info.created_by.as_ref().map(|u| u.0))
        .bind(resource.audit_info.updated_at)
        .bind(resource.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *conn)
        .await?;

        insert_claims(conn, resource.id.0, &resource.user_claims).await
    }

    /// 更新资源行并整体替换声明，返回命中的行数
    pub(crate) async fn update_resource(
        conn: &mut PgConnection,
        resource: &IdentityResource,
    ) -> Result<u64, sqlx::Error> {
        // 先清旧声明，再写新数据
        delete_claims(conn, resource.id.0).await?;

        let rows = sqlx::query(
            r#"
            UPDATE identity_resources
            SET name = $2, display_name = $3, description = $4, enabled = $5,
                required = $6, emphasize = $7, show_in_discovery = $8,
                updated_at = $9, updated_by = $10
            WHERE id = $1
            "#,
        )
        .bind(resource.id.0)
        .bind(&resource.name)
        .bind(&resource.display_name)
        .bind(&resource.description)
        .bind(resource.enabled)
        .bind(resource.required)
        .bind(resource.emphasize)
        .bind(resource.show_in_discovery)
        .bind(resource.audit_info.updated_at)
        .bind(resource.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if rows > 0 {
            insert_claims(conn, resource.id.0, &resource.user_claims).await?;
        }

        Ok(rows)
    }

    pub(crate) async fn delete_resource(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM identity_resources WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_claims(
        conn: &mut PgConnection,
        id: Uuid,
        claims: &[String],
    ) -> Result<(), sqlx::Error> {
        if claims.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO identity_resource_claims (identity_resource_id, claim_type)
            SELECT $1, UNNEST($2::TEXT[])
            "#,
        )
        .bind(id)
        .bind(claims)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn delete_claims(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM identity_resource_claims WHERE identity_resource_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub(crate) async fn count_properties(
        conn: &mut PgConnection,
        resource_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM identity_resource_properties WHERE identity_resource_id = $1",
        )
        .bind(resource_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }

    pub(crate) async fn fetch_properties_page(
        conn: &mut PgConnection,
        resource_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<IdentityResourcePropertyRow>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, identity_resource_id, key, value
            FROM identity_resource_properties
            WHERE identity_resource_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
    }

    pub(crate) async fn fetch_property(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<IdentityResourcePropertyRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, identity_resource_id, key, value FROM identity_resource_properties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub(crate) async fn insert_property(
        conn: &mut PgConnection,
        property: &IdentityResourceProperty,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO identity_resource_properties (id, identity_resource_id, key, value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(property.id.0)
        .bind(property.identity_resource_id.0)
        .bind(&property.key)
        .bind(&property.value)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn delete_property(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM identity_resource_properties WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn property_key_available(
        conn: &mut PgConnection,
        resource_id: Uuid,
        key: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT NOT EXISTS(
                SELECT 1 FROM identity_resource_properties
                WHERE identity_resource_id = $1 AND key = $2
            )
            "#,
        )
        .bind(resource_id)
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.0)
    }
}
