//! API 作用域实体

use idconf_common::AuditInfo;
use idconf_domain_core::{AggregateRoot, Entity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::ApiResourceId;

/// API 作用域 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiScopeId(pub Uuid);

impl ApiScopeId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ApiScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// API 作用域实体
///
/// 归属单个 API 资源，`name` 在全部作用域中唯一（跨资源）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiScope {
    pub id: ApiScopeId,
    pub api_resource_id: ApiResourceId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// 客户端必须显式请求该作用域
    pub required: bool,
    /// 同意页上强调显示
    pub emphasize: bool,
    pub show_in_discovery: bool,
    pub user_claims: Vec<String>,
    pub audit_info: AuditInfo,
}

impl ApiScope {
    pub fn new(api_resource_id: ApiResourceId, name: String) -> Self {
        Self {
            id: ApiScopeId::new(),
            api_resource_id,
            name,
            display_name: None,
            description: None,
            required: false,
            emphasize: false,
            show_in_discovery: true,
            user_claims: Vec::new(),
            audit_info: AuditInfo::default(),
        }
    }

    pub fn update(&mut self, display_name: Option<String>, description: Option<String>) {
        self.display_name = display_name;
        self.description = description;
    }

    pub fn add_user_claim(&mut self, claim_type: impl Into<String>) {
        let claim_type = claim_type.into();
        if !self.user_claims.contains(&claim_type) {
            self.user_claims.push(claim_type);
        }
    }

    pub fn replace_user_claims(&mut self, claims: Vec<String>) {
        self.user_claims.clear();
        for claim in claims {
            self.add_user_claim(claim);
        }
    }
}

impl Entity for ApiScope {
    type Id = ApiScopeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for ApiScope {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_scope_defaults() {
        let resource_id = ApiResourceId::new();
        let scope = ApiScope::new(resource_id.clone(), "inventory.read".to_string());

        assert_eq!(scope.api_resource_id, resource_id);
        assert!(!scope.required);
        assert!(!scope.emphasize);
        assert!(scope.show_in_discovery);
        assert!(scope.user_claims.is_empty());
    }

    #[test]
    fn test_scope_claims() {
        let mut scope = ApiScope::new(ApiResourceId::new(), "inventory.write".to_string());

        scope.add_user_claim("sub");
        scope.add_user_claim("sub");
        assert_eq!(scope.user_claims, vec!["sub"]);

        scope.replace_user_claims(vec!["email".to_string()]);
        assert_eq!(scope.user_claims, vec!["email"]);
    }
}
