//! 角色视图仓储接口（只读）

use async_trait::async_trait;
use idconf_common::{PagedResult, Pagination};
use idconf_domain_core::TreeAssembly;
use idconf_errors::AppResult;

use super::view::{RoleId, RoleView};

/// 角色视图仓储接口
///
/// 角色的写入属于身份存储，这里只做管理端读取。
#[async_trait]
pub trait RoleViewRepository: Send + Sync {
    /// 分页列出角色，可按名称模糊过滤
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RoleView>>;

    /// 根据 ID 查找角色
    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<RoleView>>;

    /// 直接子角色（按名称排序）
    async fn children_of(&self, id: &RoleId) -> AppResult<Vec<RoleView>>;

    /// 加载全部角色并组装为树
    async fn load_tree(&self) -> AppResult<TreeAssembly<RoleView>>;
}
