//! 层级角色视图
//!
//! 角色存储的只读投影，借助 domain-core 的树形视图模型
//! 组装为层级结构。

use idconf_common::{AuditInfo, random_id};
use idconf_domain_core::{AggregateRoot, Entity, TreeEntity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 角色 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RoleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// 角色视图
///
/// `normalized_name` 为大写不变形式，`concurrency_stamp`
/// 在每次持久化变更时重新生成。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleView {
    pub id: RoleId,
    pub parent_id: Option<RoleId>,
    pub name: String,
    pub normalized_name: String,
    pub concurrency_stamp: String,
    pub description: Option<String>,
    pub audit_info: AuditInfo,
}

impl RoleView {
    pub fn new(name: String, parent_id: Option<RoleId>, description: Option<String>) -> Self {
        let normalized_name = normalize_name(&name);
        Self {
            id: RoleId::new(),
            parent_id,
            name,
            normalized_name,
            concurrency_stamp: random_id().to_string(),
            description,
            audit_info: AuditInfo::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl Entity for RoleView {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for RoleView {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

impl TreeEntity for RoleView {
    fn parent_id(&self) -> Option<&RoleId> {
        self.parent_id.as_ref()
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// 角色名的大写不变形式
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use idconf_domain_core::assemble;

    #[test]
    fn test_new_role_view() {
        let view = RoleView::new("Operators".to_string(), None, None);

        assert_eq!(view.normalized_name, "OPERATORS");
        assert!(view.is_root());
        assert!(!view.concurrency_stamp.is_empty());
    }

    #[test]
    fn test_stamps_differ() {
        let a = RoleView::new("a".to_string(), None, None);
        let b = RoleView::new("b".to_string(), None, None);

        assert_ne!(a.concurrency_stamp, b.concurrency_stamp);
    }

    #[test]
    fn test_role_views_assemble() {
        let root = RoleView::new("admin".to_string(), None, None);
        let child = RoleView::new(
            "support".to_string(),
            Some(root.id.clone()),
            Some("first-line support".to_string()),
        );
        let child_id = child.id.clone();

        let assembly = assemble(vec![root, child]);

        assert!(assembly.is_complete());
        assert_eq!(assembly.roots.len(), 1);
        let found = assembly.find(&child_id).unwrap();
        assert_eq!(found.depth, 1);
        assert_eq!(found.path, "admin/support");
    }
}
