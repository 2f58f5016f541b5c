//! 身份资源领域模块

pub mod repository;
pub mod resource;

pub use repository::IdentityResourceRepository;
pub use resource::{
    IdentityResource, IdentityResourceId, IdentityResourceProperty, IdentityResourcePropertyId,
};
