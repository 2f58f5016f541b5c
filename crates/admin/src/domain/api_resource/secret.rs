//! API 密钥实体
//!
//! 共享密钥入库前做 SHA-256 散列，实体中不出现明文。

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use idconf_common::new_id;
use idconf_domain_core::Entity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::resource::ApiResourceId;

/// API 密钥 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiSecretId(pub Uuid);

impl ApiSecretId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ApiSecretId {
    fn default() -> Self {
        Self::new()
    }
}

/// 密钥类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiSecretType {
    SharedSecret,
    X509Thumbprint,
}

impl ApiSecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiSecretType::SharedSecret => "SharedSecret",
            ApiSecretType::X509Thumbprint => "X509Thumbprint",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SharedSecret" => Some(ApiSecretType::SharedSecret),
            "X509Thumbprint" => Some(ApiSecretType::X509Thumbprint),
            _ => None,
        }
    }
}

/// API 密钥实体（不可变，只增删）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSecret {
    pub id: ApiSecretId,
    pub api_resource_id: ApiResourceId,
    pub description: Option<String>,
    pub value: String,
    pub secret_type: ApiSecretType,
    pub expiration: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiSecret {
    /// 创建共享密钥，明文立即散列
    pub fn shared(
        api_resource_id: ApiResourceId,
        plain_value: &str,
        description: Option<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: ApiSecretId::new(),
            api_resource_id,
            description,
            value: hash_shared_secret(plain_value),
            secret_type: ApiSecretType::SharedSecret,
            expiration,
            created_at: Utc::now(),
        }
    }

    /// 创建证书指纹密钥，指纹原样保存
    pub fn x509_thumbprint(
        api_resource_id: ApiResourceId,
        thumbprint: String,
        description: Option<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: ApiSecretId::new(),
            api_resource_id,
            description,
            value: thumbprint,
            secret_type: ApiSecretType::X509Thumbprint,
            expiration,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(expiration) => expiration <= now,
            None => false,
        }
    }

    /// 校验提交的明文是否与已存散列一致
    pub fn matches(&self, plain_value: &str) -> bool {
        self.secret_type == ApiSecretType::SharedSecret
            && self.value == hash_shared_secret(plain_value)
    }
}

impl Entity for ApiSecret {
    type Id = ApiSecretId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// SHA-256 后 base64 编码
pub fn hash_shared_secret(plain_value: &str) -> String {
    let digest = Sha256::digest(plain_value.as_bytes());
    BASE64.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_shared_secret_hashed() {
        let secret = ApiSecret::shared(ApiResourceId::new(), "top-secret", None, None);

        assert_eq!(secret.secret_type, ApiSecretType::SharedSecret);
        assert_ne!(secret.value, "top-secret");
        assert!(secret.matches("top-secret"));
        assert!(!secret.matches("wrong"));
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_shared_secret("abc"), hash_shared_secret("abc"));
        assert_ne!(hash_shared_secret("abc"), hash_shared_secret("abd"));
    }

    #[test]
    fn test_thumbprint_verbatim() {
        let secret = ApiSecret::x509_thumbprint(
            ApiResourceId::new(),
            "98D3ACF057299C3745044BE918986AD7ED0AD4A2".to_string(),
            None,
            None,
        );

        assert_eq!(secret.value, "98D3ACF057299C3745044BE918986AD7ED0AD4A2");
        assert!(!secret.matches("98D3ACF057299C3745044BE918986AD7ED0AD4A2"));
    }

    #[test]
    fn test_expiration() {
        let now = Utc::now();
        let expired = ApiSecret::shared(
            ApiResourceId::new(),
            "s",
            None,
            Some(now - Duration::hours(1)),
        );
        let valid = ApiSecret::shared(
            ApiResourceId::new(),
            "s",
            None,
            Some(now + Duration::hours(1)),
        );
        let permanent = ApiSecret::shared(ApiResourceId::new(), "s", None, None);

        assert!(expired.is_expired(now));
        assert!(!valid.is_expired(now));
        assert!(!permanent.is_expired(now));
    }

    #[test]
    fn test_secret_type_roundtrip() {
        assert_eq!(
            ApiSecretType::parse("SharedSecret"),
            Some(ApiSecretType::SharedSecret)
        );
        assert_eq!(
            ApiSecretType::parse(ApiSecretType::X509Thumbprint.as_str()),
            Some(ApiSecretType::X509Thumbprint)
        );
        assert_eq!(ApiSecretType::parse("jwk"), None);
    }
}
