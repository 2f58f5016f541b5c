//! 身份资源实体
//!
//! 身份资源定义一组可随 ID 令牌发放的用户声明（如 profile、email）。

use idconf_common::AuditInfo;
use idconf_domain_core::{AggregateRoot, Entity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 身份资源 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityResourceId(pub Uuid);

impl IdentityResourceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for IdentityResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IdentityResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 身份资源实体，`name` 全局唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResource {
    pub id: IdentityResourceId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery: bool,
    pub user_claims: Vec<String>,
    pub audit_info: AuditInfo,
}

impl IdentityResource {
    pub fn new(name: String, display_name: Option<String>, description: Option<String>) -> Self {
        Self {
            id: IdentityResourceId::new(),
            name,
            display_name,
            description,
            enabled: true,
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

impl Entity for IdentityResource {
    type Id = IdentityResourceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for IdentityResource {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

/// 身份资源属性 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityResourcePropertyId(pub Uuid);

impl IdentityResourcePropertyId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for IdentityResourcePropertyId {
    fn default() -> Self {
        Self::new()
    }
}

/// 身份资源附加属性，`key` 在所属资源内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResourceProperty {
    pub id: IdentityResourcePropertyId,
    pub identity_resource_id: IdentityResourceId,
    pub key: String,
    pub value: String,
}

impl IdentityResourceProperty {
    pub fn new(identity_resource_id: IdentityResourceId, key: String, value: String) -> Self {
        Self {
            id: IdentityResourcePropertyId::new(),
            identity_resource_id,
            key,
            value,
        }
    }
}

impl Entity for IdentityResourceProperty {
    type Id = IdentityResourcePropertyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_identity_resource() {
        let mut resource = IdentityResource::new(
            "profile".to_string(),
            Some("User profile".to_string()),
            None,
        );
        resource.add_user_claim("name");
        resource.add_user_claim("family_name");
        resource.add_user_claim("name");

        assert!(resource.enabled);
        assert!(!resource.required);
        assert_eq!(resource.user_claims, vec!["name", "family_name"]);
    }

    #[test]
    fn test_update_display() {
        let mut resource = IdentityResource::new("email".to_string(), None, None);
        resource.update(Some("E-mail".to_string()), Some("Your e-mail address".to_string()));

        assert_eq!(resource.display_name.as_deref(), Some("E-mail"));
        assert_eq!(resource.description.as_deref(), Some("Your e-mail address"));
    }
}
