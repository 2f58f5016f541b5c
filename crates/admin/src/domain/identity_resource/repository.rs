//! 身份资源仓储接口

use async_trait::async_trait;
use idconf_common::{PagedResult, Pagination};
use idconf_errors::AppResult;

use super::resource::{
    IdentityResource, IdentityResourceId, IdentityResourceProperty, IdentityResourcePropertyId,
};

/// 身份资源仓储接口
#[async_trait]
pub trait IdentityResourceRepository: Send + Sync {
    /// 分页列出身份资源，可按名称模糊过滤
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResource>>;

    /// 根据 ID 查找（含用户声明）
    async fn find_by_id(&self, id: &IdentityResourceId) -> AppResult<Option<IdentityResource>>;

    /// 根据名称查找
    async fn find_by_name(&self, name: &str) -> AppResult<Option<IdentityResource>>;

    /// 创建身份资源
    async fn create(&self, resource: &IdentityResource) -> AppResult<()>;

    /// 更新身份资源，声明集合整体替换
    async fn update(&self, resource: &IdentityResource) -> AppResult<()>;

    /// 删除身份资源（级联删除声明与属性）
    async fn delete(&self, id: &IdentityResourceId) -> AppResult<()>;

    /// 名称是否可用；编辑时传入 `exclude` 跳过自身
    async fn name_available(
        &self,
        name: &str,
        exclude: Option<&IdentityResourceId>,
    ) -> AppResult<bool>;

    /// 分页列出属性（新的在前）
    async fn list_properties(
        &self,
        resource_id: &IdentityResourceId,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<IdentityResourceProperty>>;

    /// 根据 ID 查找属性
    async fn find_property(
        &self,
        id: &IdentityResourcePropertyId,
    ) -> AppResult<Option<IdentityResourceProperty>>;

    /// 添加属性，所属资源必须存在
    async fn add_property(&self, property: &IdentityResourceProperty) -> AppResult<()>;

    /// 删除属性
    async fn delete_property(&self, id: &IdentityResourcePropertyId) -> AppResult<()>;

    /// 属性 key 在资源内是否可用
    async fn property_key_available(
        &self,
        resource_id: &IdentityResourceId,
        key: &str,
    ) -> AppResult<bool>;
}
