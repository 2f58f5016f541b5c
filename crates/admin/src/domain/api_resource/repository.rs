//! API 资源仓储接口

use async_trait::async_trait;
use idconf_common::{PagedResult, Pagination};
use idconf_errors::AppResult;

use super::resource::{ApiResource, ApiResourceId, ApiResourceProperty, ApiResourcePropertyId};
use super::scope::{ApiScope, ApiScopeId};
use super::secret::{ApiSecret, ApiSecretId};

/// API 资源仓储接口
#[async_trait]
pub trait ApiResourceRepository: Send + Sync {
    /// 分页列出资源，可按名称模糊过滤
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiResource>>;

    /// 根据 ID 查找资源（含用户声明）
    async fn find_by_id(&self, id: &ApiResourceId) -> AppResult<Option<ApiResource>>;

    /// 根据名称查找资源
    async fn find_by_name(&self, name: &str) -> AppResult<Option<ApiResource>>;

    /// 只取资源名称
    async fn get_name(&self, id: &ApiResourceId) -> AppResult<Option<String>>;

    /// 创建资源
    async fn create(&self, resource: &ApiResource) -> AppResult<()>;

    /// 更新资源，声明集合整体替换
    async fn update(&self, resource: &ApiResource) -> AppResult<()>;

    /// 删除资源（级联删除声明、属性、作用域、密钥）
    async fn delete(&self, id: &ApiResourceId) -> AppResult<()>;

    /// 名称是否可用；编辑时传入 `exclude` 跳过自身
    async fn name_available(
        &self,
        name: &str,
        exclude: Option<&ApiResourceId>,
    ) -> AppResult<bool>;

    /// 分页列出资源属性（新的在前）
    async fn list_properties(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiResourceProperty>>;

    /// 根据 ID 查找属性
    async fn find_property(
        &self,
        id: &ApiResourcePropertyId,
    ) -> AppResult<Option<ApiResourceProperty>>;

    /// 添加属性，所属资源必须存在
    async fn add_property(&self, property: &ApiResourceProperty) -> AppResult<()>;

    /// 删除属性
    async fn delete_property(&self, id: &ApiResourcePropertyId) -> AppResult<()>;

    /// 属性 key 在资源内是否可用
    async fn property_key_available(
        &self,
        resource_id: &ApiResourceId,
        key: &str,
    ) -> AppResult<bool>;
}

/// API 作用域仓储接口
#[async_trait]
pub trait ApiScopeRepository: Send + Sync {
    /// 分页列出资源下的作用域
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiScope>>;

    /// 在指定资源范围内查找作用域（含用户声明）
    async fn find_by_id(
        &self,
        resource_id: &ApiResourceId,
        scope_id: &ApiScopeId,
    ) -> AppResult<Option<ApiScope>>;

    /// 创建作用域，所属资源必须存在
    async fn create(&self, scope: &ApiScope) -> AppResult<()>;

    /// 更新作用域，声明集合整体替换
    async fn update(&self, scope: &ApiScope) -> AppResult<()>;

    /// 删除作用域
    async fn delete(&self, id: &ApiScopeId) -> AppResult<()>;

    /// 名称是否可用（跨资源全局唯一）
    async fn name_available(&self, name: &str, exclude: Option<&ApiScopeId>) -> AppResult<bool>;
}

/// API 密钥仓储接口（密钥不可变，无更新操作）
#[async_trait]
pub trait ApiSecretRepository: Send + Sync {
    /// 分页列出资源下的密钥（新的在前）
    async fn list_by_resource(
        &self,
        resource_id: &ApiResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<ApiSecret>>;

    /// 根据 ID 查找密钥
    async fn find_by_id(&self, id: &ApiSecretId) -> AppResult<Option<ApiSecret>>;

    /// 添加密钥，所属资源必须存在
    async fn add(&self, secret: &ApiSecret) -> AppResult<()>;

    /// 删除密钥
    async fn delete(&self, id: &ApiSecretId) -> AppResult<()>;
}
