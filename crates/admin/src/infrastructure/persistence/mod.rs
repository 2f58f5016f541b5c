//! 持久化层模块

pub mod admin_unit_of_work;
pub mod api_resource_repository;
pub mod api_scope_repository;
pub mod api_secret_repository;
pub mod db_metrics;
pub mod error_mapper;
pub mod identity_resource_repository;
pub mod role_view_repository;
pub mod schema;
pub mod tx_repositories;

pub use admin_unit_of_work::{PostgresAdminUnitOfWork, PostgresAdminUnitOfWorkFactory};
pub use api_resource_repository::PostgresApiResourceRepository;
pub use api_scope_repository::PostgresApiScopeRepository;
pub use api_secret_repository::PostgresApiSecretRepository;
pub use identity_resource_repository::PostgresIdentityResourceRepository;
pub use role_view_repository::PostgresRoleViewRepository;
pub use schema::{migrations, run_migrations};

/// 名称模糊匹配的 LIKE 模式
pub(crate) fn like_pattern(search: &str) -> String {
    format!("%{}%", search)
}
