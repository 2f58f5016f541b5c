//! API 资源领域模块

pub mod repository;
pub mod resource;
pub mod scope;
pub mod secret;

pub use repository::{ApiResourceRepository, ApiScopeRepository, ApiSecretRepository};
pub use resource::{ApiResource, ApiResourceId, ApiResourceProperty, ApiResourcePropertyId};
pub use scope::{ApiScope, ApiScopeId};
pub use secret::{ApiSecret, ApiSecretId, ApiSecretType};
