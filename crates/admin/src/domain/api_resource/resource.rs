//! API 资源实体

use idconf_common::AuditInfo;
use idconf_domain_core::{AggregateRoot, Entity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API 资源 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiResourceId(pub Uuid);

impl ApiResourceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ApiResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ApiResourceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// API 资源实体
///
/// `name` 在所有资源中唯一，`user_claims` 为发到访问令牌的声明类型集合。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResource {
    pub id: ApiResourceId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub user_claims: Vec<String>,
    pub audit_info: AuditInfo,
}

impl ApiResource {
    pub fn new(name: String, display_name: Option<String>, description: Option<String>) -> Self {
        Self {
            id: ApiResourceId::new(),
            name,
            display_name,
            description,
            enabled: true,
            user_claims: Vec::new(),
            audit_info: AuditInfo::default(),
        }
    }

    /// 更新展示信息
    pub fn update(&mut self, display_name: Option<String>, description: Option<String>) {
        self.display_name = display_name;
        self.description = description;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// 添加用户声明（去重）
    pub fn add_user_claim(&mut self, claim_type: impl Into<String>) {
        let claim_type = claim_type.into();
        if !self.user_claims.contains(&claim_type) {
            self.user_claims.push(claim_type);
        }
    }

    pub fn remove_user_claim(&mut self, claim_type: &str) {
        self.user_claims.retain(|c| c != claim_type);
    }

    /// 整体替换声明集合（保序去重）
    pub fn replace_user_claims(&mut self, claims: Vec<String>) {
        self.user_claims.clear();
        for claim in claims {
            self.add_user_claim(claim);
        }
    }
}

impl Entity for ApiResource {
    type Id = ApiResourceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for ApiResource {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

/// API 资源属性 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiResourcePropertyId(pub Uuid);

impl ApiResourcePropertyId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ApiResourcePropertyId {
    fn default() -> Self {
        Self::new()
    }
}

/// API 资源附加属性
///
/// `key` 在所属资源内唯一。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResourceProperty {
    pub id: ApiResourcePropertyId,
    pub api_resource_id: ApiResourceId,
    pub key: String,
    pub value: String,
}

impl ApiResourceProperty {
    pub fn new(api_resource_id: ApiResourceId, key: String, value: String) -> Self {
        Self {
            id: ApiResourcePropertyId::new(),
            api_resource_id,
            key,
            value,
        }
    }
}

impl Entity for ApiResourceProperty {
    type Id = ApiResourcePropertyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_api_resource() {
        let resource = ApiResource::new(
            "inventory-api".to_string(),
            Some("Inventory API".to_string()),
            None,
        );

        assert_eq!(resource.name, "inventory-api");
        assert!(resource.enabled);
        assert!(resource.user_claims.is_empty());
    }

    #[test]
    fn test_claims_deduplicated() {
        let mut resource = ApiResource::new("api".to_string(), None, None);

        resource.add_user_claim("email");
        resource.add_user_claim("role");
        resource.add_user_claim("email");
        assert_eq!(resource.user_claims, vec!["email", "role"]);

        resource.remove_user_claim("email");
        assert_eq!(resource.user_claims, vec!["role"]);
    }

    #[test]
    fn test_replace_claims() {
        let mut resource = ApiResource::new("api".to_string(), None, None);
        resource.add_user_claim("sub");

        resource.replace_user_claims(vec![
            "email".to_string(),
            "name".to_string(),
            "email".to_string(),
        ]);
        assert_eq!(resource.user_claims, vec!["email", "name"]);
    }

    #[test]
    fn test_enable_disable() {
        let mut resource = ApiResource::new("api".to_string(), None, None);

        resource.disable();
        assert!(!resource.enabled);

        resource.enable();
        assert!(resource.enabled);
    }
}
