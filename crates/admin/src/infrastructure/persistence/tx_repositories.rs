//! 事务感知仓储实现
//!
//! 这些仓储共享同一个外部事务，供 Unit of Work 把多个写操作
//! 绑定到一次提交；查询逻辑与池实现共用。

use async_trait::async_trait;
use idconf_common::{PagedResult, Pagination};
use idconf_config::AdminConfig;
use idconf_errors::{AppError, AppResult};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::api_resource_repository::queries as api_resource_queries;
use super::api_scope_repository::queries as api_scope_queries;
use super::api_secret_repository::queries as api_secret_queries;
use super::error_mapper::map_sqlx_error;
use super::identity_resource_repository::queries as identity_resource_queries;
use super::like_pattern;
use crate::domain::api_resource::{
    ApiResource, ApiResourceId, ApiResourceProperty, ApiResourcePropertyId, ApiResourceRepository,
    ApiScope, ApiScopeId, ApiScopeRepository, ApiSecret, ApiSecretId, ApiSecretRepository,
};
use crate::domain::identity_resource::{
    IdentityResource, IdentityResourceId, IdentityResourceProperty, IdentityResourcePropertyId,
    IdentityResourceRepository,
};

/// Shared transaction type
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Macro to define a TxRepository structure
macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

/// 取出事务引用，已提交或回滚则报错
macro_rules! tx_conn {
    ($self:ident, $guard:ident, $tx:ident) => {
        let mut $guard = $self.tx.lock().await;
        let $tx = $guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
    };
}

define_tx_repo!(TxApiResourceRepository);
define_tx_repo!(TxApiScopeRepository);
define_tx_repo!(TxApiSecretRepository);
define_tx_repo!(TxIdentityResourceRepository);

fn clamp(pagination: &Pagination) -> Pagination {
    let paging = AdminConfig::default();
    pagination
        .clone()
        .clamped(paging.default_page_size, paging.max_page_size)
}

#[async_trait]
impl ApiResourceRepository for TxApiResourceRepository {
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiResource>> {
        let pagination = clamp(pagination);
        let pattern = search.map(like_pattern);
        tx_conn!(self, guard, tx);

        let total = api_resource_queries::count_resources(tx, pattern.as_deref())
            .await
            .map_err(map_sqlx_error)?;
        let items = api_resource_queries::fetch_resources_with_claims(
            tx,
            pattern.as_deref(),
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn find_by_id(&self, id: &ApiResourceId) -> AppResult<Option<ApiResource>> {
        tx_conn!(self, guard, tx);
        api_resource_queries::fetch_resource_with_claims(tx, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<ApiResource>> {
        tx_conn!(self, guard, tx);
        api_resource_queries::fetch_resource_by_name_with_claims(tx, name)
            .await
            .map_err(map_sqlx_error)
    }

    async fn get_name(&self, id: &ApiResourceId) -> AppResult<Option<String>> {
        tx_conn!(self, guard, tx);
        api_resource_queries::fetch_resource_name(tx, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, resource: &ApiResource) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        api_resource_queries::insert_resource(tx, resource)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update(&self, resource: &ApiResource) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_resource_queries::update_resource(tx, resource)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                resource.id
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: &ApiResourceId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_resource_queries::delete_resource(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!("API resource {} not found", id)));
        }

        Ok(())
    }

    async fn name_available(
        &self,
        name: &str,
        exclude: Option<&ApiResourceId>,
    ) -> AppResult<bool> {
        tx_conn!(self, guard, tx);
        api_resource_queries::resource_name_available(tx, name, exclude.map(|id| id.0))
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_properties(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiResourceProperty>> {
        let pagination = clamp(pagination);
        tx_conn!(self, guard, tx);

        let total = api_resource_queries::count_properties(tx, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let rows = api_resource_queries::fetch_properties_page(
            tx,
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
        id: &ApiResourcePropertyId,
    ) -> AppResult<Option<ApiResourceProperty>> {
        tx_conn!(self, guard, tx);
        let row = api_resource_queries::fetch_property(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn add_property(&self, property: &ApiResourceProperty) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        if !api_resource_queries::resource_exists(tx, property.api_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                property.api_resource_id
            )));
        }

        api_resource_queries::insert_property(tx, property)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete_property(&self, id: &ApiResourcePropertyId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_resource_queries::delete_property(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found("API resource property not found"));
        }

        Ok(())
    }

    async fn property_key_available(
        &self,
        resource_id: &ApiResourceId,
        key: &str,
    ) -> AppResult<bool> {
        tx_conn!(self, guard, tx);
        api_resource_queries::property_key_available(tx, resource_id.0, key)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ApiScopeRepository for TxApiScopeRepository {
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiScope>> {
        let pagination = clamp(pagination);
        tx_conn!(self, guard, tx);

        let total = api_scope_queries::count_by_resource(tx, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let items = api_scope_queries::fetch_scopes_with_claims(
            tx,
            resource_id.0,
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn find_by_id(
        &self,
        resource_id: &ApiResourceId,
        scope_id: &ApiScopeId,
    ) -> AppResult<Option<ApiScope>> {
        tx_conn!(self, guard, tx);
        api_scope_queries::fetch_scope_with_claims(tx, resource_id.0, scope_id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, scope: &ApiScope) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        if !api_resource_queries::resource_exists(tx, scope.api_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                scope.api_resource_id
            )));
        }

        api_scope_queries::insert_scope(tx, scope)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update(&self, scope: &ApiScope) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_scope_queries::update_scope(tx, scope)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!("API scope {} not found", scope.id)));
        }

        Ok(())
    }

    async fn delete(&self, id: &ApiScopeId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_scope_queries::delete_scope(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!("API scope {} not found", id)));
        }

        Ok(())
    }

    async fn name_available(&self, name: &str, exclude: Option<&ApiScopeId>) -> AppResult<bool> {
        tx_conn!(self, guard, tx);
        api_scope_queries::scope_name_available(tx, name, exclude.map(|id| id.0))
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ApiSecretRepository for TxApiSecretRepository {
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiSecret>> {
        let pagination = clamp(pagination);
        tx_conn!(self, guard, tx);

        let total = api_secret_queries::count_by_resource(tx, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let items = api_secret_queries::fetch_secrets_page(
            tx,
            resource_id.0,
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn find_by_id(&self, id: &ApiSecretId) -> AppResult<Option<ApiSecret>> {
        tx_conn!(self, guard, tx);
        api_secret_queries::fetch_secret(tx, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn add(&self, secret: &ApiSecret) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        if !api_resource_queries::resource_exists(tx, secret.api_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "API resource {} not found",
                secret.api_resource_id
            )));
        }

        api_secret_queries::insert_secret(tx, secret)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&self, id: &ApiSecretId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = api_secret_queries::delete_secret(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found("API secret not found"));
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityResourceRepository for TxIdentityResourceRepository {
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResource>> {
        let pagination = clamp(pagination);
        let pattern = search.map(like_pattern);
        tx_conn!(self, guard, tx);

        let total = identity_resource_queries::count_resources(tx, pattern.as_deref())
            .await
            .map_err(map_sqlx_error)?;
        let items = identity_resource_queries::fetch_resources_with_claims(
            tx,
            pattern.as_deref(),
            pagination.page_size as i64,
            pagination.offset() as i64,
        )
        .await
        .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(items, total as u64, &pagination))
    }

    async fn find_by_id(&self, id: &IdentityResourceId) -> AppResult<Option<IdentityResource>> {
        tx_conn!(self, guard, tx);
        identity_resource_queries::fetch_resource_with_claims(tx, id.0)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<IdentityResource>> {
        tx_conn!(self, guard, tx);
        identity_resource_queries::fetch_resource_by_name_with_claims(tx, name)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create(&self, resource: &IdentityResource) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        identity_resource_queries::insert_resource(tx, resource)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update(&self, resource: &IdentityResource) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = identity_resource_queries::update_resource(tx, resource)
            .await
            .map_err(map_sqlx_error)?;
        if rows == 0 {
            return Err(AppError::not_found(format!(
                "Identity resource {} not found",
                resource.id
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: &IdentityResourceId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = identity_resource_queries::delete_resource(tx, id.0)
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
        tx_conn!(self, guard, tx);
        identity_resource_queries::resource_name_available(tx, name, exclude.map(|id| id.0))
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_properties(
        &self,
        resource_id: &IdentityResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResourceProperty>> {
        let pagination = clamp(pagination);
        tx_conn!(self, guard, tx);

        let total = identity_resource_queries::count_properties(tx, resource_id.0)
            .await
            .map_err(map_sqlx_error)?;
        let rows = identity_resource_queries::fetch_properties_page(
            tx,
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
        tx_conn!(self, guard, tx);
        let row = identity_resource_queries::fetch_property(tx, id.0)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn add_property(&self, property: &IdentityResourceProperty) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        if !identity_resource_queries::resource_exists(tx, property.identity_resource_id.0)
            .await
            .map_err(map_sqlx_error)?
        {
            return Err(AppError::not_found(format!(
                "Identity resource {} not found",
                property.identity_resource_id
            )));
        }

        identity_resource_queries::insert_property(tx, property)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete_property(&self, id: &IdentityResourcePropertyId) -> AppResult<()> {
        tx_conn!(self, guard, tx);
        let rows = identity_resource_queries::delete_property(tx, id.0)
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
        tx_conn!(self, guard, tx);
        identity_resource_queries::property_key_available(tx, resource_id.0, key)
            .await
            .map_err(map_sqlx_error)
    }
}
