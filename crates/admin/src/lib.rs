//! idconf-admin - OAuth/OIDC 资源服务器配置的管理端数据访问层
//!
//! 覆盖 API 资源、作用域、密钥、声明的 CRUD 仓储，
//! 以及层级角色的树形视图。

pub mod domain;
pub mod infrastructure;
