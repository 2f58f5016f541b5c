//! 基础设施层

pub mod persistence;

pub use persistence::{
    PostgresAdminUnitOfWork, PostgresAdminUnitOfWorkFactory, PostgresApiResourceRepository,
    PostgresApiScopeRepository, PostgresApiSecretRepository, PostgresIdentityResourceRepository,
    PostgresRoleViewRepository,
};
