//! Unit of Work 模式
//!
//! 将多个仓储的写操作绑定到同一事务，由调用方显式提交。

use async_trait::async_trait;
use idconf_errors::AppResult;

use crate::domain::api_resource::{ApiResourceRepository, ApiScopeRepository, ApiSecretRepository};
use crate::domain::identity_resource::IdentityResourceRepository;

/// 管理端 Unit of Work trait
///
/// 提交或回滚都会消费掉该单元。
#[async_trait]
pub trait AdminUnitOfWork: Send + Sync {
    /// 获取 API 资源仓储
    fn api_resources(&self) -> &dyn ApiResourceRepository;

    /// 获取 API 作用域仓储
    fn api_scopes(&self) -> &dyn ApiScopeRepository;

    /// 获取 API 密钥仓储
    fn api_secrets(&self) -> &dyn ApiSecretRepository;

    /// 获取身份资源仓储
    fn identity_resources(&self) -> &dyn IdentityResourceRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait AdminUnitOfWorkFactory: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn AdminUnitOfWork>>;
}
